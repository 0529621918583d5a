use super::encode::{Decodable, Encodable};
use super::errors::{field, DecodeError};
use super::stream::{ByteReader, ByteWriter};

/// Maximum size in bytes of a loaded bloom filter.
pub const MAX_FILTER_LOAD_SIZE: usize = 36000;

/// Maximum number of hash functions a bloom filter may request.
pub const MAX_FILTER_HASH_FUNCTIONS: u32 = 50;

/// The maximum size of any potentially matched object.
pub const MAX_FILTER_ADD_DATA_SIZE: usize = 520;

/// Don't adjust the filter when a match is found.
pub const BLOOM_UPDATE_NONE: u8 = 0;

/// Add the outpoint of every matched transaction output to the filter.
pub const BLOOM_UPDATE_ALL: u8 = 1;

/// Add the outpoint only for pay-to-pubkey and multisig outputs.
pub const BLOOM_UPDATE_P2PUBKEY_ONLY: u8 = 2;

/// Sets the connection's bloom filter. Until one is loaded, a peer that
/// advertised filtering support relays nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLoadMessage {
    pub filter: Vec<u8>,
    pub num_hash_functions: u32,
    pub tweak: u32,
    pub flags: u8,
}

impl FilterLoadMessage {
    pub fn new(
        filter: Vec<u8>,
        num_hash_functions: u32,
        tweak: u32,
        flags: u8,
    ) -> Result<Self, DecodeError> {
        if filter.len() > MAX_FILTER_LOAD_SIZE {
            return Err(DecodeError::OutOfRange("filter"));
        }
        if num_hash_functions > MAX_FILTER_HASH_FUNCTIONS {
            return Err(DecodeError::OutOfRange("num_hash_functions"));
        }
        Ok(Self {
            filter,
            num_hash_functions,
            tweak,
            flags,
        })
    }
}

impl Encodable for FilterLoadMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_bytes(&self.filter);
        writer.write_u32_le(self.num_hash_functions);
        writer.write_u32_le(self.tweak);
        writer.write_u8(self.flags);
    }
}

impl Decodable for FilterLoadMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let filter_length = reader.read_var_int().map_err(field("filter"))? as usize;
        if filter_length > MAX_FILTER_LOAD_SIZE {
            return Err(DecodeError::OutOfRange("filter"));
        }
        let filter = reader.read_bytes(filter_length).map_err(field("filter"))?;

        let num_hash_functions = reader
            .read_u32_le()
            .map_err(field("num_hash_functions"))?;
        if num_hash_functions > MAX_FILTER_HASH_FUNCTIONS {
            return Err(DecodeError::OutOfRange("num_hash_functions"));
        }

        let tweak = reader.read_u32_le().map_err(field("tweak"))?;
        let flags = reader.read_u8().map_err(field("flags"))?;

        Ok(Self {
            filter,
            num_hash_functions,
            tweak,
            flags,
        })
    }
}

/// Adds one data element to the connection's previously loaded filter.
///
/// The element is bounded by [`MAX_FILTER_ADD_DATA_SIZE`]; construction and
/// decoding both refuse an empty or oversized element, so an instance
/// always holds valid filter data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAddMessage {
    filter_data: Vec<u8>,
}

impl FilterAddMessage {
    pub fn new(filter_data: Vec<u8>) -> Result<Self, DecodeError> {
        if filter_data.is_empty() || filter_data.len() > MAX_FILTER_ADD_DATA_SIZE {
            return Err(DecodeError::OutOfRange("filter_data"));
        }
        Ok(Self { filter_data })
    }

    pub fn filter_data(&self) -> &[u8] {
        &self.filter_data
    }
}

impl Encodable for FilterAddMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_bytes(&self.filter_data);
    }
}

impl Decodable for FilterAddMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let length = reader.read_var_int().map_err(field("filter_data"))? as usize;
        if length == 0 || length > MAX_FILTER_ADD_DATA_SIZE {
            return Err(DecodeError::OutOfRange("filter_data"));
        }
        let filter_data = reader.read_bytes(length).map_err(field("filter_data"))?;
        Ok(Self { filter_data })
    }
}
