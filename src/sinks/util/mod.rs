//! Sections shared by the sinks.

pub mod acknowledgements;
pub mod auth;
pub mod batch;
pub mod buffer;
pub mod encoding;
pub mod request;
pub mod tls;

pub use acknowledgements::AcknowledgementsConfig;
pub use auth::{Auth, AuthConfig};
pub use batch::BatchConfig;
pub use buffer::BufferConfig;
pub use encoding::EncodingConfig;
pub use request::RequestConfig;
pub use tls::TlsConfig;

use super::{BuildError, SinkContext};
use crate::element::{Element, Elements};

fn push<E: Element + 'static>(elements: &mut Elements, element: Option<E>) {
    if let Some(element) = element {
        elements.push(Box::new(element));
    }
}

/// Appends the delivery, request, TLS and auth sections of a sink, in that
/// order. Sections with nothing to configure are left out.
pub fn push_sections(
    elements: &mut Elements,
    cx: &SinkContext<'_>,
    request: RequestConfig,
) -> Result<(), BuildError> {
    push(
        elements,
        AcknowledgementsConfig::from_tuning(&cx.id, cx.tuning),
    );
    push(elements, BatchConfig::from_tuning(&cx.id, cx.tuning));
    push(elements, BufferConfig::from_tuning(&cx.id, cx.tuning));
    push(elements, request.into_section());
    push(elements, TlsConfig::build(cx)?);
    push(elements, AuthConfig::build(cx)?);
    Ok(())
}
