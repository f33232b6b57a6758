//! Chart menu integration
//!
//! Sonification is offered to users as one entry in the chart's context
//! (export) menu. Hosts render the entry and call [`MenuItem::invoke`] when
//! it is chosen.

use serde::Serialize;

use crate::audio::AudioEngine;
use crate::chart::ChartHost;
use crate::error::SonifyError;
use crate::playback::Sonifier;

pub const SONIFY_CHART_TEXT: &str = "Sonify chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MenuAction {
    SonifyChart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub text: &'static str,
    pub action: MenuAction,
}

impl MenuItem {
    pub fn invoke<H: ChartHost + ?Sized>(
        &self,
        sonifier: &mut Sonifier,
        engine: &mut dyn AudioEngine,
        chart: &H,
    ) -> Result<(), SonifyError> {
        match self.action {
            MenuAction::SonifyChart => sonifier.sonify_chart(engine, chart),
        }
    }
}

pub fn sonify_menu_item() -> MenuItem {
    MenuItem {
        text: SONIFY_CHART_TEXT,
        action: MenuAction::SonifyChart,
    }
}

/// Add the sonify entry to an existing menu, once.
pub fn append_to(items: &mut Vec<MenuItem>) {
    if !items.iter().any(|item| item.action == MenuAction::SonifyChart) {
        items.push(sonify_menu_item());
    }
}
