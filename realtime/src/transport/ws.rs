//! WebSocket transport backed by tokio-tungstenite.

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::{Connector, Frame, Transport};
use crate::error::Result;
use crate::protocol::close_code;

/// Connects with `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Transport>> {
        let url = url.to_string();
        Box::pin(async move {
            let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
            let (mut sink, mut source) = stream.split();

            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Frame>();
            let (in_tx, in_rx) = mpsc::unbounded_channel::<Frame>();

            // Writer task: forward outgoing frames to the socket
            tokio::spawn(async move {
                while let Some(frame) = out_rx.recv().await {
                    let (message, last) = match frame {
                        Frame::Text(text) => (Message::text(text), false),
                        Frame::Close(code) => (
                            Message::Close(Some(CloseFrame {
                                code: CloseCode::from(code),
                                reason: "".into(),
                            })),
                            true,
                        ),
                    };
                    if sink.send(message).await.is_err() || last {
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            // Reader task: surface text frames and exactly one close
            tokio::spawn(async move {
                let mut code = close_code::ABNORMAL;
                while let Some(message) = source.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            if in_tx.send(Frame::Text(text.as_str().to_owned())).is_err() {
                                return;
                            }
                        }
                        Ok(Message::Close(frame)) => {
                            code = frame
                                .map(|f| u16::from(f.code))
                                .unwrap_or(close_code::NO_STATUS);
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(error = %e, "WebSocket read failed");
                            break;
                        }
                    }
                }
                let _ = in_tx.send(Frame::Close(code));
            });

            Ok(Transport {
                outgoing: out_tx,
                incoming: in_rx,
            })
        })
    }
}
