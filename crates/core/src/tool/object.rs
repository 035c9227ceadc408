use std::pin::Pin;
use std::sync::Arc;

use tracing::Instrument;

use super::{Tool, ToolResult};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn execute(
        self: Arc<Self>,
        input: String,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn execute(
        self: Arc<Self>,
        input: String,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let span = debug_span!("tool execute", tool = self.0.name());
        trace!(parent: &span, "input: {input:?}");
        let fut = self.0.execute(input);
        Box::pin(
            async move {
                let result = fut.await;
                match &result {
                    Ok(output) => trace!("output: {output:?}"),
                    Err(err) => debug!("failed: {err}"),
                }
                result
            }
            .instrument(span),
        )
    }
}
