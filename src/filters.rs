//! Filter controls: the three selectors read at request time, their option
//! catalogues, and the year populator.

use crate::gateway::{Gateway, HotspotQuery, Year};
use crate::logging::{log, log_failure, obj, Domain, Level};

/// Weather codes understood by the backend.
pub const WEATHER_CODES: [(u8, &str); 6] = [
    (0, "Fine without high winds"),
    (1, "Fine with high winds"),
    (2, "Raining with high winds"),
    (3, "Fog or mist"),
    (4, "Snowing with high winds"),
    (5, "Raining"),
];

/// Road class codes understood by the backend.
pub const ROAD_CLASS_CODES: [(u8, &str); 4] = [(0, "Unclassified"), (1, "A"), (2, "B"), (3, "Motorway")];

pub const ALL_LABEL: &str = "All";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn all() -> Self {
        Self {
            value: String::new(),
            label: ALL_LABEL.to_string(),
        }
    }
}

/// A drop-down: ordered options and the index of the selected one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectControl {
    options: Vec<SelectOption>,
    selected: usize,
}

impl Default for SelectControl {
    fn default() -> Self {
        Self::all_only()
    }
}

impl SelectControl {
    pub fn all_only() -> Self {
        Self {
            options: vec![SelectOption::all()],
            selected: 0,
        }
    }

    pub fn from_codes(codes: &[(u8, &str)]) -> Self {
        let mut ctl = Self::all_only();
        ctl.options.extend(codes.iter().map(|(code, label)| SelectOption {
            value: code.to_string(),
            label: label.to_string(),
        }));
        ctl
    }

    /// Replaces the option list with "All" followed by `values` in order.
    pub fn reset_with<I: IntoIterator<Item = String>>(&mut self, values: I) {
        self.options = vec![SelectOption::all()];
        self.options.extend(values.into_iter().map(|v| SelectOption {
            label: v.clone(),
            value: v,
        }));
        self.selected = 0;
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// The selected option's value; empty for "All".
    pub fn value(&self) -> &str {
        self.options
            .get(self.selected)
            .map(|o| o.value.as_str())
            .unwrap_or("")
    }

    pub fn selected_label(&self) -> &str {
        self.options
            .get(self.selected)
            .map(|o| o.label.as_str())
            .unwrap_or(ALL_LABEL)
    }

    /// Selects the first option whose value matches. Returns false if none does.
    pub fn select_value(&mut self, value: &str) -> bool {
        match self.options.iter().position(|o| o.value == value) {
            Some(i) => {
                self.selected = i;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterControls {
    pub year: SelectControl,
    pub weather: SelectControl,
    pub road_class: SelectControl,
}

impl Default for FilterControls {
    fn default() -> Self {
        Self {
            year: SelectControl::all_only(),
            weather: SelectControl::from_codes(&WEATHER_CODES),
            road_class: SelectControl::from_codes(&ROAD_CLASS_CODES),
        }
    }
}

impl FilterControls {
    /// Current selection, read at the start of each hotspot query.
    pub fn selection(&self) -> HotspotQuery {
        HotspotQuery {
            year: self.year.value().to_string(),
            weather_code: self.weather.value().to_string(),
            road_class_code: self.road_class.value().to_string(),
        }
    }
}

/// Fills `control` from `/years`. On failure the control keeps only "All".
pub async fn populate_years<G: Gateway + ?Sized>(gateway: &G, control: &mut SelectControl) {
    control.reset_with(std::iter::empty::<String>());
    match gateway.years().await {
        Ok(years) => {
            let count = years.len();
            control.reset_with(years.into_iter().map(|Year(y)| y));
            log(
                Level::Info,
                Domain::Filters,
                "years_loaded",
                obj(&[("count", serde_json::json!(count))]),
            );
        }
        Err(err) => log_failure(Domain::Filters, "years", &err),
    }
}
