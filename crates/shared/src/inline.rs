//! Inline `&`/`§` formatting codes in player-typed text.
//!
//! Supported: legacy colors `&0`-`&f`, decorations `&l &o &n &m &k`, reset `&r`,
//! hex colors `&#RRGGBB`, `&x&R&R&G&G&B&B` and bare `#RRGGBB`. A backslash
//! escapes `&` so `\&c` stays literal.

use crate::{
    color::{NamedColor, Rgb},
    text::{RichText, Style},
};

pub fn parse_inline(input: &str) -> RichText {
    let chars: Vec<char> = input.chars().collect();
    let mut builder = Builder::default();
    let mut index = 0;

    while index < chars.len() {
        let current = chars[index];

        if current == '\\' && chars.get(index + 1) == Some(&'&') {
            builder.buffer.push('&');
            index += 2;
            continue;
        }

        if is_format_char(current) {
            if let Some(consumed) = builder.apply_code(&chars, index) {
                index += consumed;
                continue;
            }
        }

        if current == '#' {
            if let Some(rgb) = hex_at(&chars, index + 1) {
                builder.set_color(rgb);
                index += 7;
                continue;
            }
        }

        builder.buffer.push(current);
        index += 1;
    }

    builder.finish()
}

fn is_format_char(c: char) -> bool {
    c == '&' || c == '§'
}

fn hex_at(chars: &[char], start: usize) -> Option<Rgb> {
    let digits: String = chars.get(start..start + 6)?.iter().collect();
    Rgb::parse_hex6(&digits)
}

/// `&x&R&R&G&G&B&B` starting at `start` (the `&` before `x`).
fn spigot_hex_at(chars: &[char], start: usize) -> Option<Rgb> {
    let pairs = chars.get(start + 2..start + 14)?;
    let mut digits = String::with_capacity(6);
    for pair in pairs.chunks(2) {
        if !is_format_char(pair[0]) {
            return None;
        }
        digits.push(pair[1]);
    }
    Rgb::parse_hex6(&digits)
}

#[derive(Default)]
struct Builder {
    root: RichText,
    style: Style,
    buffer: String,
}

impl Builder {
    /// Applies the format code at `index`, returning how many chars it used.
    fn apply_code(&mut self, chars: &[char], index: usize) -> Option<usize> {
        let code = chars.get(index + 1)?.to_ascii_lowercase();
        if code == 'x' {
            let rgb = spigot_hex_at(chars, index)?;
            self.set_color(rgb);
            return Some(14);
        }
        if code == '#' {
            let rgb = hex_at(chars, index + 2)?;
            self.set_color(rgb);
            return Some(8);
        }
        if let Some(named) = NamedColor::from_code(code) {
            self.set_color(named.rgb());
            return Some(2);
        }

        self.flush();
        match code {
            'l' => self.style.bold = Some(true),
            'o' => self.style.italic = Some(true),
            'n' => self.style.underlined = Some(true),
            'm' => self.style.strikethrough = Some(true),
            'k' => self.style.obfuscated = Some(true),
            'r' => self.style = Style::default(),
            _ => return None,
        }
        Some(2)
    }

    /// A color change also clears decorations.
    fn set_color(&mut self, rgb: Rgb) {
        self.flush();
        self.style = Style {
            color: Some(rgb),
            ..Style::default()
        };
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut segment = RichText::literal(std::mem::take(&mut self.buffer));
        segment.style = self.style.clone();
        self.root.push(segment);
    }

    fn finish(mut self) -> RichText {
        self.flush();
        if self.root.children.len() == 1 && self.root.children[0].style.is_empty() {
            return self.root.children.remove(0);
        }
        self.root
    }
}
