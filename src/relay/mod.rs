//! 转发 - 把通知/告警请求转成推送消息发往推送网关
//!
//! 客户端收到的 `InboundMessage` 就是这里构造的 `ProviderMessage.data`。

pub mod client;
pub mod message;

pub use client::{GatewayResponse, RelayClient, RelayOutcome, API_KEY_HEADER};
pub use message::{ProviderData, ProviderMessage, RelayKind, RelayRequest};
