use crate::cli::ColorMode;
use lazy_static::lazy_static;
use nu_ansi_term::{AnsiGenericString, Color, Style};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    pub(crate) static ref ERROR_INDICATOR: Style = Color::Red.bold();
    pub(crate) static ref WARNING_INDICATOR: Style = Color::Yellow.bold();
    pub(crate) static ref DIAGNOSTIC_TEXT: Style = Color::Default.bold();
}

/// What happened to a registry entry, as reported by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Added,
    Skipped,
    Removed,
}

impl Outcome {
    fn style(self) -> Style {
        match self {
            Outcome::Added => Color::Green.bold(),
            Outcome::Skipped => Color::DarkGray.normal(),
            Outcome::Removed => Color::Red.normal(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Outcome::Added => "added",
            Outcome::Skipped => "skipped",
            Outcome::Removed => "removed",
        }
    }

    /// The label padded to a common width, so that names line up.
    pub(crate) fn tag(self) -> String {
        let tag = format!("{:<7}", self.label());

        self.style().maybe_paint(tag.as_str()).to_string()
    }
}

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(cmode: ColorMode) {
    USE_COLOR.store(matches!(cmode, ColorMode::On), Ordering::Relaxed);
}

pub(crate) fn color_mode() -> ColorMode {
    match USE_COLOR.load(Ordering::Relaxed) {
        true => ColorMode::On,
        false => ColorMode::Off,
    }
}

pub(crate) trait MaybePaint {
    /// Paints `input` only when color output is enabled.
    #[must_use]
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug;
}

impl MaybePaint for Style {
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug,
    {
        match color_mode() {
            ColorMode::On => self.paint(input),
            ColorMode::Off => {
                let cow: Cow<'a, S> = input.into();

                cow.into()
            }
        }
    }
}
