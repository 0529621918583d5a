use super::encode::{Decodable, Encodable};
use super::errors::{field, DecodeError, StreamError};
use super::stream::{double_sha256, ByteReader, ByteWriter, Hash256};

/// Reference to a specific output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
}

impl Encodable for OutPoint {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_hash256(&self.hash);
        writer.write_u32_le(self.index);
    }
}

impl Decodable for OutPoint {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let hash = reader.read_hash256().map_err(field("hash"))?;
        let index = reader.read_u32_le().map_err(field("index"))?;
        Ok(Self { hash, index })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub previous_output: OutPoint,
    /// Raw unlocking script bytes. Script evaluation is out of scope; the
    /// bytes are carried opaquely.
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl Encodable for TransactionInput {
    fn encode(&self, writer: &mut ByteWriter) {
        self.previous_output.encode(writer);
        writer.write_var_bytes(&self.signature_script);
        writer.write_u32_le(self.sequence);
    }
}

impl Decodable for TransactionInput {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let previous_output = OutPoint::decode(reader)?;
        let signature_script = reader.read_var_bytes().map_err(field("signature_script"))?;
        let sequence = reader.read_u32_le().map_err(field("sequence"))?;
        Ok(Self {
            previous_output,
            signature_script,
            sequence,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Amount in satoshis.
    pub value: i64,
    /// Raw locking script bytes, carried opaquely.
    pub public_key_script: Vec<u8>,
}

impl Encodable for TransactionOutput {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_i64_le(self.value);
        writer.write_var_bytes(&self.public_key_script);
    }
}

impl Decodable for TransactionOutput {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let value = reader.read_i64_le().map_err(field("value"))?;
        let public_key_script = reader.read_var_bytes().map_err(field("public_key_script"))?;
        Ok(Self {
            value,
            public_key_script,
        })
    }
}

/// A structurally decoded transaction. Inputs, outputs and scripts are
/// parsed for shape only; no validation beyond the wire layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

// Smallest possible serialized input (36-byte outpoint + empty script +
// sequence) and output (value + empty script), used to bound list
// allocations against the bytes actually present.
const MIN_INPUT_SIZE: usize = 41;
const MIN_OUTPUT_SIZE: usize = 9;

impl Transaction {
    /// Computes the transaction identifier: SHA256(SHA256(serialization)).
    pub fn hash(&self) -> Hash256 {
        Hash256::from_wire(double_sha256(&self.to_bytes()))
    }
}

impl Encodable for Transaction {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_i32_le(self.version);
        writer.write_var_int(self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode(writer);
        }
        writer.write_var_int(self.outputs.len() as u64);
        for output in &self.outputs {
            output.encode(writer);
        }
        writer.write_u32_le(self.lock_time);
    }
}

impl Decodable for Transaction {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_i32_le().map_err(field("version"))?;

        let input_count = reader.read_var_int().map_err(field("inputs"))? as usize;
        if input_count > reader.remaining() / MIN_INPUT_SIZE {
            return Err(field("inputs")(StreamError::TruncatedInput("input")));
        }
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TransactionInput::decode(reader)?);
        }

        let output_count = reader.read_var_int().map_err(field("outputs"))? as usize;
        if output_count > reader.remaining() / MIN_OUTPUT_SIZE {
            return Err(field("outputs")(StreamError::TruncatedInput("output")));
        }
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TransactionOutput::decode(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(field("lock_time"))?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                previous_output: OutPoint {
                    hash: Hash256([0x42; 32]),
                    index: 0,
                },
                signature_script: vec![0x51, 0x52, 0x53],
                sequence: 0xFFFFFFFF,
            }],
            outputs: vec![
                TransactionOutput {
                    value: 50_0000_0000,
                    public_key_script: vec![0x76, 0xA9, 0x14],
                },
                TransactionOutput {
                    value: 1234,
                    public_key_script: vec![],
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn transaction_round_trip() {
        let tx = sample_transaction();
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
    }

    #[test]
    fn transaction_layout() {
        let tx = sample_transaction();
        let bytes = tx.to_bytes();

        // version
        assert_eq!(&bytes[..4], &1i32.to_le_bytes());
        // one input, outpoint hash in wire order
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..37], &[0x42; 32]);
        // outpoint index, then var-length script
        assert_eq!(&bytes[37..41], &0u32.to_le_bytes());
        assert_eq!(bytes[41], 3);
    }

    #[test]
    fn transaction_hash_is_stable() {
        let tx = sample_transaction();
        assert_eq!(tx.hash(), tx.hash());
        assert_ne!(tx.hash(), Hash256::ZERO);
    }

    #[test]
    fn transaction_rejects_impossible_input_count() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.push(0xFD);
        bytes.extend_from_slice(&1000u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 50]);
        assert!(Transaction::from_bytes(&bytes).is_err());
    }

    #[test]
    fn transaction_truncated_output_fails() {
        let tx = sample_transaction();
        let mut bytes = tx.to_bytes();
        bytes.truncate(bytes.len() - 6);
        assert!(Transaction::from_bytes(&bytes).is_err());
    }
}
