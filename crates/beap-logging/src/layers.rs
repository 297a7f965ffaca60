//! Custom tracing layers
//!
//! [`BuildContextLayer`] attaches the active build context to new spans.

use tracing::{span, Subscriber};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::context::{BuildContextData, BuildContextGuard};

/// Layer that injects build context into spans
pub struct BuildContextLayer;

impl BuildContextLayer {
    /// Create a new build context layer
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuildContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct BuildContextExtension {
    pub data: BuildContextData,
}

impl<S> Layer<S> for BuildContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(build_ctx) = BuildContextGuard::current() {
                span.extensions_mut()
                    .insert(BuildContextExtension { data: build_ctx });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn test_layer_runs_under_active_context() {
        let subscriber = Registry::default().with(BuildContextLayer::new());
        tracing::subscriber::with_default(subscriber, || {
            let guard = BuildContextGuard::new("qBEAP", "A1B2C3D4");
            let span = tracing::info_span!("build");
            let _entered = span.enter();
            // The layer runs on span creation; the guard remains the source of truth
            assert_eq!(BuildContextGuard::current_build_id(), Some(guard.build_id()));
        });
    }
}
