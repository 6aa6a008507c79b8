use std::fmt::Debug;
use std::sync::Arc;

use crate::{Body, HttpSend, Result};

/// Layer is one middleware in a [`Pipeline`].
///
/// A layer receives the request and the rest of the chain. It can change the request,
/// call `next.run` zero or more times, and inspect or replace the response.
pub trait Layer: Debug + Send + Sync + 'static {
    /// Handle the request.
    fn call(&self, req: http::Request<Body>, next: Next<'_>) -> Result<http::Response<Body>>;
}

/// Next is the remaining part of the chain after the current layer.
///
/// It is `Copy`, so layers that retry can run it more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    layers: &'a [Arc<dyn Layer>],
    send: &'a dyn HttpSend,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain.
    pub fn run(self, req: http::Request<Body>) -> Result<http::Response<Body>> {
        match self.layers.split_first() {
            Some((layer, rest)) => layer.call(
                req,
                Next {
                    layers: rest,
                    send: self.send,
                },
            ),
            None => self.send.http_send(req),
        }
    }
}

/// Pipeline is an ordered list of layers in front of an [`HttpSend`].
///
/// The first pushed layer sees the request first and the response last.
#[derive(Clone, Debug)]
pub struct Pipeline {
    layers: Vec<Arc<dyn Layer>>,
    send: Arc<dyn HttpSend>,
}

impl Pipeline {
    /// Create a pipeline without layers.
    pub fn new(send: impl HttpSend) -> Self {
        Self::from_arc(Arc::new(send))
    }

    /// Create a pipeline around a shared sender.
    pub fn from_arc(send: Arc<dyn HttpSend>) -> Self {
        Self {
            layers: Vec::new(),
            send,
        }
    }

    /// Append a layer at the inner end of the chain.
    pub fn layer(mut self, layer: impl Layer) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Append a shared layer at the inner end of the chain.
    pub fn layer_arc(mut self, layer: Arc<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Send a request through every layer.
    pub fn send(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
        Next {
            layers: &self.layers,
            send: self.send.as_ref(),
        }
        .run(req)
    }
}
