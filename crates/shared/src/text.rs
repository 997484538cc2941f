use serde::{Deserialize, Serialize};

use crate::color::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    RunCommand,
    SuggestCommand,
    OpenUrl,
    CopyToClipboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub action: ClickAction,
    pub value: String,
}

impl ClickEvent {
    pub fn run_command(value: impl Into<String>) -> Self {
        Self {
            action: ClickAction::RunCommand,
            value: value.into(),
        }
    }

    pub fn suggest_command(value: impl Into<String>) -> Self {
        Self {
            action: ClickAction::SuggestCommand,
            value: value.into(),
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(
            self.action,
            ClickAction::RunCommand | ClickAction::SuggestCommand
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlined: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<ClickEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<Box<RichText>>,
    /// Hidden text carried with the node; never rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion: Option<String>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Translatable {
        key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<RichText>,
    },
}

/// Styled text tree in the shape chat clients render.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub content: Content,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RichText>,
}

impl RichText {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            ..Self::default()
        }
    }

    pub fn translatable(key: impl Into<String>, args: Vec<RichText>) -> Self {
        Self {
            content: Content::Translatable {
                key: key.into(),
                args,
            },
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<Rgb>) -> Self {
        self.style.color = Some(color.into());
        self
    }

    pub fn with_style(mut self, edit: impl FnOnce(&mut Style)) -> Self {
        edit(&mut self.style);
        self
    }

    pub fn with_click(mut self, click: ClickEvent) -> Self {
        self.style.click = Some(click);
        self
    }

    pub fn with_hover(mut self, hover: RichText) -> Self {
        self.style.hover = Some(Box::new(hover));
        self
    }

    pub fn with_insertion(mut self, insertion: impl Into<String>) -> Self {
        self.style.insertion = Some(insertion.into());
        self
    }

    pub fn append(mut self, child: RichText) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: RichText) {
        self.children.push(child);
    }

    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Pre-order walk over this node, its translation arguments, then its children.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// The rendered string with all styling dropped. Translatable nodes without a
    /// local translation table render their arguments separated by spaces, or the
    /// key itself when there are none.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        match &self.content {
            Content::Empty => {}
            Content::Text(text) => out.push_str(text),
            Content::Translatable { key, args } if args.is_empty() => out.push_str(key),
            Content::Translatable { args, .. } => {
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        out.push(' ');
                    }
                    arg.write_plain(out);
                }
            }
        }
        for child in &self.children {
            child.write_plain(out);
        }
    }

    pub fn translation_key(&self) -> Option<&str> {
        match &self.content {
            Content::Translatable { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Value of the first run/suggest-command click action in the tree.
    pub fn first_command_click(&self) -> Option<&str> {
        self.nodes()
            .filter_map(|node| node.style.click.as_ref())
            .find(|click| click.is_command())
            .map(|click| click.value.as_str())
    }

    pub fn has_any_click(&self) -> bool {
        self.nodes().any(|node| node.style.click.is_some())
    }

    /// Copy of the tree with every node forced to `color`. Click, hover and
    /// insertion data are kept.
    pub fn recolored(&self, color: impl Into<Rgb>) -> RichText {
        let color = color.into();
        self.recolor_with(color)
    }

    fn recolor_with(&self, color: Rgb) -> RichText {
        let content = match &self.content {
            Content::Translatable { key, args } => Content::Translatable {
                key: key.clone(),
                args: args.iter().map(|arg| arg.recolor_with(color)).collect(),
            },
            other => other.clone(),
        };
        let mut style = self.style.clone();
        style.color = Some(color);
        RichText {
            content,
            style,
            children: self
                .children
                .iter()
                .map(|child| child.recolor_with(color))
                .collect(),
        }
    }
}

impl From<&str> for RichText {
    fn from(value: &str) -> Self {
        RichText::literal(value)
    }
}

impl From<String> for RichText {
    fn from(value: String) -> Self {
        RichText::literal(value)
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a RichText>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a RichText;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        if let Content::Translatable { args, .. } = &node.content {
            self.stack.extend(args.iter().rev());
        }
        Some(node)
    }
}
