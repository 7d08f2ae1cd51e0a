use minijinja::{context, Environment, UndefinedBehavior};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

#[derive(RustEmbed)]
#[folder = "prompts/"]
struct PromptAssets;

/// Which instruction template a generation request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Read-only SELECT queries
    Select,
    /// DML and DDL commands
    Modify,
}

impl QueryKind {
    fn template_name(self) -> &'static str {
        match self {
            QueryKind::Select => "select.txt",
            QueryKind::Modify => "modify.txt",
        }
    }
}

pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_loader(|name| {
            Ok(PromptAssets::get(name)
                .map(|file| String::from_utf8_lossy(&file.data).into_owned()))
        });
        Self { env }
    }

    /// Fills the template for `kind` with the rendered schema and the user's text.
    pub fn build(
        &self,
        kind: QueryKind,
        schema: &str,
        question: &str,
    ) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(kind.template_name())?;
        template.render(context! { schema => schema, question => question })
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
