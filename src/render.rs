use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("resume", include_str!("../templates/resume.hbs")),
];

/// Page templates. Built-ins are compiled in; `<dir>/<name>.hbs` overrides them.
pub struct Templates {
    hb: Handlebars<'static>,
}

impl Templates {
    pub fn builtin() -> anyhow::Result<Self> {
        let mut hb = Handlebars::new();
        for &(name, source) in BUILTIN {
            hb.register_template_string(name, source)
                .with_context(|| format!("built-in template `{name}` is invalid"))?;
        }
        Ok(Self { hb })
    }

    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let mut templates = Self::builtin()?;
        for &(name, _) in BUILTIN {
            let path = dir.join(format!("{name}.hbs"));
            if !path.is_file() {
                continue;
            }
            templates
                .hb
                .register_template_file(name, &path)
                .with_context(|| format!("failed to load template: {}", path.display()))?;
            tracing::debug!(template = name, path = %path.display(), "using template override");
        }
        Ok(templates)
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> anyhow::Result<String> {
        self.hb
            .render(name, data)
            .with_context(|| format!("failed to render template `{name}`"))
    }
}
