use crate::channel::Channel;

pub const DEFAULT_SWITCH_KEY: &str = "$";

/// How the channel of an outgoing line was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// No selector; the line falls back to the default channel.
    Default,
    /// Leading `!`, always GLOBAL.
    Bang,
    /// Switch key followed by a channel letter, e.g. `$l`.
    SwitchKey,
    /// A legacy `#alias ` prefix.
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutgoing {
    pub channel: Channel,
    pub body: String,
    pub selector: Selector,
}

impl ParsedOutgoing {
    fn new(channel: Channel, body: &str, selector: Selector) -> Self {
        Self {
            channel,
            body: body.to_string(),
            selector,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.selector != Selector::Default
    }
}

/// Splits typed text into its target channel and body.
///
/// Precedence: `!` > switch key > legacy prefixes > default channel.
pub fn parse_outgoing(raw: &str, switch_key: &str) -> ParsedOutgoing {
    if raw.is_empty() {
        return ParsedOutgoing::new(Channel::default(), "", Selector::Default);
    }

    if let Some(rest) = raw.strip_prefix('!') {
        return ParsedOutgoing::new(Channel::Global, strip_one_space(rest), Selector::Bang);
    }

    if let Some(parsed) = parse_switch_key(raw, switch_key) {
        return parsed;
    }

    for channel in Channel::ALL {
        for prefix in channel.legacy_prefixes() {
            if let Some(rest) = strip_prefix_ignore_case(raw, prefix) {
                return ParsedOutgoing::new(channel, rest, Selector::Prefix);
            }
        }
    }

    ParsedOutgoing::new(Channel::default(), raw, Selector::Default)
}

fn parse_switch_key(raw: &str, switch_key: &str) -> Option<ParsedOutgoing> {
    if switch_key.is_empty() || raw.chars().count() <= switch_key.chars().count() {
        return None;
    }
    let after_key = raw.strip_prefix(switch_key)?;
    let mut chars = after_key.chars();
    let channel = chars.next().and_then(Channel::from_switch_letter)?;
    Some(ParsedOutgoing::new(
        channel,
        strip_one_space(chars.as_str()),
        Selector::SwitchKey,
    ))
}

fn strip_one_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

fn strip_prefix_ignore_case<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = raw.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let consumed = rest.next().map_or(raw.len(), |(index, _)| index);
    Some(&raw[consumed..])
}
