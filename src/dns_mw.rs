use std::sync::Arc;

use crate::{
    dns::{DnsContext, DnsError, DnsRequest, DnsResponse, Message, MessageType, OpCode, ResponseCode},
    dns_conf::RuntimeConfig,
    log::debug,
    middleware::{Middleware, MiddlewareBuilder, MiddlewareDefaultHandler, MiddlewareHost},
};

pub type DnsMiddlewareHost = MiddlewareHost<DnsContext, DnsRequest, DnsResponse, DnsError>;

pub struct DnsMiddlewareHandler {
    cfg: Arc<RuntimeConfig>,
    host: DnsMiddlewareHost,
}

impl DnsMiddlewareHandler {
    pub async fn search(&self, ctx: &mut DnsContext, req: &DnsRequest) -> Result<DnsResponse, DnsError> {
        self.host.execute(ctx, req).await
    }

    /// Handles one question end to end.
    ///
    /// Always yields a reply to write back. The error, if any, is the one behind
    /// a SERVFAIL and is returned for logging only.
    pub async fn serve(&self, req: &DnsRequest) -> (DnsResponse, Option<DnsError>) {
        let mut ctx = DnsContext::new(self.cfg.clone());

        let res = match self.search(&mut ctx, req).await {
            Ok(res) => (res, ctx.take_error()),
            Err(err) => (
                DnsResponse::error(req.message(), ResponseCode::ServFail),
                Some(err),
            ),
        };

        debug!(
            "{} {} {:?} -> {} ({} answers)",
            req.query().name(),
            req.query().query_type(),
            ctx.lookup_source,
            res.0.response_code(),
            res.0.answers().len()
        );

        res
    }

    /// Like [`serve`](Self::serve) for a raw message.
    ///
    /// Responses get no reply at all. Opcodes other than QUERY are answered
    /// with NOTIMP, a query without a question with FORMERR.
    pub async fn serve_message(&self, message: Message) -> Option<(DnsResponse, Option<DnsError>)> {
        if message.message_type() != MessageType::Query {
            debug!("ignoring response message {}", message.id());
            return None;
        }

        let op_code = message.op_code();
        if op_code != OpCode::Query {
            return Some((
                DnsResponse::error(&message, ResponseCode::NotImp),
                Some(DnsError::UnsupportedOpCode(op_code)),
            ));
        }

        Some(match DnsRequest::new(message.clone()) {
            Ok(req) => self.serve(&req).await,
            Err(err) => (DnsResponse::error(&message, ResponseCode::FormErr), Some(err)),
        })
    }

    #[inline]
    pub fn names(&self) -> Vec<&'static str> {
        self.host.names()
    }
}

pub struct DnsMiddlewareBuilder {
    builder: MiddlewareBuilder<DnsContext, DnsRequest, DnsResponse, DnsError>,
}

impl DnsMiddlewareBuilder {
    pub fn new() -> Self {
        Self {
            builder: MiddlewareBuilder::new(DnsDefaultHandler),
        }
    }

    pub fn with<M: Middleware<DnsContext, DnsRequest, DnsResponse, DnsError> + 'static>(
        mut self,
        middleware: M,
    ) -> Self {
        self.builder = self.builder.with(middleware);
        self
    }

    pub fn build(self, cfg: Arc<RuntimeConfig>) -> DnsMiddlewareHandler {
        DnsMiddlewareHandler {
            host: self.builder.build(),
            cfg,
        }
    }
}

impl Default for DnsMiddlewareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The end of the pipeline: nobody is left to delegate to.
struct DnsDefaultHandler;

#[async_trait::async_trait]
impl MiddlewareDefaultHandler<DnsContext, DnsRequest, DnsResponse, DnsError> for DnsDefaultHandler {
    async fn handle(
        &self,
        _ctx: &mut DnsContext,
        _req: &DnsRequest,
    ) -> Result<DnsResponse, DnsError> {
        Err(DnsError::NoNextHandler)
    }
}

#[cfg(test)]
pub use mock::*;
