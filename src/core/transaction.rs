// A transaction is an application record plus the detached signature over
// its canonical bytes and the PEM public key that produced it.

use crate::error::{LedgerError, Result};
use crate::wallet::{verify_signature, KeyPair};
use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arbitrary application payload.
///
/// The canonical form is compact JSON with object keys in sorted order
/// (serde_json maps are BTreeMap-backed), so identical logical content always
/// yields identical bytes. Inside bincode the payload is stored as that text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn new(value: Value) -> Payload {
        Payload(value)
    }

    pub fn get_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    fn from_canonical_json(text: &str) -> std::result::Result<Payload, DecodeError> {
        serde_json::from_str(text)
            .map(Payload)
            .map_err(|e| DecodeError::OtherString(format!("Invalid payload JSON: {e}")))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

impl bincode::Encode for Payload {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> std::result::Result<(), EncodeError> {
        let text = self
            .canonical_json()
            .map_err(|e| EncodeError::OtherString(e.to_string()))?;
        bincode::Encode::encode(&text, encoder)
    }
}

impl<Context> bincode::Decode<Context> for Payload {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let text = <String as bincode::Decode<Context>>::decode(decoder)?;
        Payload::from_canonical_json(&text)
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for Payload {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let text = <String as bincode::BorrowDecode<'de, Context>>::borrow_decode(decoder)?;
        Payload::from_canonical_json(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    payload: Payload,
    signature: Vec<u8>,
    public_key: String, // PEM
}

impl Transaction {
    pub fn new(payload: Payload, signature: Vec<u8>, public_key: &str) -> Transaction {
        Transaction {
            payload,
            signature,
            public_key: public_key.to_string(),
        }
    }

    /// Sign `payload` with `keys` and bundle the signature and public key.
    pub fn sign(payload: Payload, keys: &KeyPair) -> Result<Transaction> {
        let signature = keys.sign(&payload.canonical_bytes()?)?;
        Ok(Transaction {
            payload,
            signature,
            public_key: keys.public_key_pem(),
        })
    }

    pub fn verify(&self) -> bool {
        match self.payload.canonical_bytes() {
            Ok(message) => verify_signature(&message, &self.signature, &self.public_key),
            Err(_) => false,
        }
    }

    /// Like `verify`, but as a `Result` the ledger can hand back to callers.
    pub fn check_signature(&self) -> Result<()> {
        if self.verify() {
            Ok(())
        } else {
            Err(LedgerError::RejectedTransaction(
                "signature does not match payload and public key".to_string(),
            ))
        }
    }

    pub fn get_payload(&self) -> &Payload {
        &self.payload
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_public_key(&self) -> &str {
        self.public_key.as_str()
    }
}
