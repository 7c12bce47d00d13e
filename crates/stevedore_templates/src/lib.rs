//! # stevedore_templates
//!
//! Config-file templates for stevedore.
//!
//! Templates are plain text with `{{ name }}` placeholders. Resolved
//! environment values are exposed as `env.<KEY>`, region and service metadata
//! under bare names. Rendering is strict: a reference to an undefined
//! variable is an error, never an empty string.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stevedore_templates::{TemplateContext, TemplateLoader, TemplateRenderer};
//!
//! let loader = TemplateLoader::for_service("services/webapp", ".");
//! let source = loader.load("webapp.conf.j2").unwrap();
//!
//! let context = TemplateContext::new()
//!     .with_value("region", "minikube")
//!     .with_value("namespace", "apps");
//!
//! let rendered = TemplateRenderer::new()
//!     .render("webapp.conf.j2", &source, &context)
//!     .unwrap();
//! ```

pub mod context;
pub mod error;
pub mod loader;
pub mod renderer;

pub use context::TemplateContext;
pub use error::{TemplateError, TemplateResult};
pub use loader::{TemplateLoader, TemplateSet};
pub use renderer::TemplateRenderer;
