use crate::error::WakuError;

use super::rpc::HistoryRpc;

/// Encodes/decodes the body of one store frame.
///
/// Framing (length prefix) is applied by the transport helpers; a codec
/// only sees the frame body.
pub trait HistoryCodec: Send + Sync {
    fn encode(&self, rpc: &HistoryRpc) -> Result<Vec<u8>, WakuError>;
    fn decode(&self, data: &[u8]) -> Result<HistoryRpc, WakuError>;
}

/// MessagePack codec (compact binary, field order as declared).
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl HistoryCodec for MsgPackCodec {
    fn encode(&self, rpc: &HistoryRpc) -> Result<Vec<u8>, WakuError> {
        rmp_serde::to_vec(rpc).map_err(Into::into)
    }

    fn decode(&self, data: &[u8]) -> Result<HistoryRpc, WakuError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}
