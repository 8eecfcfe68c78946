use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Markdown { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Markdown { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Narrative { block_id: String, text: TextObject },
    Card { block_id: String, title: String, body: String },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn cards(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Card { title, body, .. } => Some((title.as_str(), body.as_str())),
            _ => None,
        })
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn narrative<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut NarrativeBuilder),
    {
        let mut builder = NarrativeBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Narrative { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn card(
        mut self,
        block_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.blocks.push(Block::Card {
            block_id: block_id.into(),
            title: title.into(),
            body: body.into(),
        });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct NarrativeBuilder {
    text: Option<TextObject>,
}

impl NarrativeBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn markdown(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::markdown(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .narrative("chat.error.summary.v1", |narrative| {
            narrative.markdown(format!("⚠ {summary}"));
        })
        .context("chat.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn starter_prompts_message(prompts: &[&str]) -> MessageTemplate {
    let listed = prompts
        .iter()
        .enumerate()
        .map(|(index, prompt)| format!("  {}. {prompt}", index + 1))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new("Or start with one of these questions")
        .narrative("chat.starters.list.v1", |narrative| {
            narrative.plain(format!("Or start with one of these questions:\n{listed}"));
        })
        .context("chat.starters.hint.v1", |context| {
            context.plain("Type a number to pick a question.");
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Chat command help")
        .narrative("chat.help.summary.v1", |narrative| {
            narrative.markdown(
                "*Available commands*\n• `/help`\n• `/history`\n• `/quit`\nAnything else is sent to the assistant.",
            );
        })
        .build()
}
