use rdkafka::Message;

use crate::messages::OrderCreated;

/// An inbound record detached from the consumer that received it.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Record key as text; empty when the record carried no key.
    pub key: String,
    pub payload: Vec<u8>,
}

impl InboundRecord {
    pub fn from_message<M: Message>(message: &M) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|key| String::from_utf8_lossy(key).into_owned())
                .unwrap_or_default(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn decode(&self) -> Result<OrderCreated, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
