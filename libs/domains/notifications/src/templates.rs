//! Email template rendering.
//!
//! Templates are Handlebars files named `<name>.html` in one directory. A job
//! with `"template": "welcome"` renders `welcome.html` with the job's
//! variables as the context.

use crate::error::{NotificationError, NotificationResult};
use chrono::Local;
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Format used by `{{now}}` when no format argument is given.
pub const DEFAULT_NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TEMPLATE_EXTENSION: &str = "html";

/// Turns a template name and variables into an HTML body.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with `variables`.
    ///
    /// Fails with `TemplateNotFound` for unknown names and `Render` for
    /// unresolved variables or broken templates.
    fn render(&self, template: &str, variables: &Map<String, Value>) -> NotificationResult<String>;

    /// Whether `template` is known to this renderer.
    fn has_template(&self, template: &str) -> bool;
}

/// Handlebars renderer in strict mode.
///
/// Registers a `now` helper: `{{now}}` prints the local time with
/// [`DEFAULT_NOW_FORMAT`]; `{{now "%Y"}}` takes a chrono format string.
pub struct HandlebarsRenderer {
    registry: RwLock<Handlebars<'static>>,
    directory: Option<PathBuf>,
}

impl HandlebarsRenderer {
    /// Create a renderer with no templates.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Self::registry()),
            directory: None,
        }
    }

    /// Create a renderer with every `*.html` file of `directory` registered.
    pub fn from_directory(directory: impl AsRef<Path>) -> NotificationResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        let registry = Self::load(&directory)?;

        Ok(Self {
            registry: RwLock::new(registry),
            directory: Some(directory),
        })
    }

    /// Register a template from a string.
    pub fn register_template(&self, name: &str, source: &str) -> NotificationResult<()> {
        self.write().register_template_string(name, source)?;
        Ok(())
    }

    /// Re-read the template directory.
    ///
    /// Templates added with [`register_template`](Self::register_template)
    /// are dropped. Returns the number of templates loaded.
    pub fn reload(&self) -> NotificationResult<usize> {
        let Some(directory) = &self.directory else {
            return Err(NotificationError::Config(
                "renderer was not created from a directory".to_string(),
            ));
        };

        let registry = Self::load(directory)?;
        let count = registry.get_templates().len();
        *self.write() = registry;
        Ok(count)
    }

    /// Names of all registered templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().get_templates().keys().cloned().collect();
        names.sort();
        names
    }

    fn registry() -> Handlebars<'static> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_helper("now", Box::new(now_helper));
        handlebars
    }

    fn load(directory: &Path) -> NotificationResult<Handlebars<'static>> {
        let mut handlebars = Self::registry();

        let entries = std::fs::read_dir(directory).map_err(|e| {
            NotificationError::Io(format!(
                "cannot read template directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            handlebars.register_template_file(name, &path)?;
            debug!(template = %name, path = %path.display(), "Registered email template");
        }

        info!(
            directory = %directory.display(),
            count = handlebars.get_templates().len(),
            "Loaded email templates"
        );
        Ok(handlebars)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Handlebars<'static>> {
        self.registry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Handlebars<'static>> {
        self.registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("directory", &self.directory)
            .field("templates", &self.template_names())
            .finish()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, variables: &Map<String, Value>) -> NotificationResult<String> {
        let registry = self.read();
        if !registry.has_template(template) {
            return Err(NotificationError::TemplateNotFound(template.to_string()));
        }

        debug!(template = %template, "Rendering email template");
        Ok(registry.render(template, variables)?)
    }

    fn has_template(&self, template: &str) -> bool {
        self.read().has_template(template)
    }
}

fn now_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let format = h
        .param(0)
        .and_then(|p| p.value().as_str())
        .unwrap_or(DEFAULT_NOW_FORMAT);

    let mut rendered = String::new();
    write!(rendered, "{}", Local::now().format(format))
        .map_err(|_| RenderErrorReason::Other(format!("invalid time format: {}", format)))?;

    out.write(&rendered)?;
    Ok(())
}
