/*!
 # Heater control

 Hysteresis control around the scheduled target temperature. The heater
 switches on once the measured temperature drops to `target - hysteresis`
 and off once it reaches `target + hysteresis`; in between it keeps its
 previous state.
*/

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::settings::UserSettings;
use crate::Result;

/// Default hysteresis threshold in degrees Celsius
pub const DEFAULT_HYSTERESIS: f32 = 1.0;

/// Heater controller state
#[derive(Debug, Clone)]
pub struct Thermostat {
    /// Hysteresis threshold in degrees Celsius
    pub hysteresis: f32,
    heater: bool,
    temp: Option<f32>,
    temp_target: Option<f32>,
}

/// Snapshot of the controller, as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatState {
    /// Local time of the snapshot, ISO 8601
    pub date_time: String,
    pub heater: bool,
    pub temp: Option<f32>,
    pub temp_target: Option<f32>,
}

impl Default for Thermostat {
    fn default() -> Self {
        Self::new(DEFAULT_HYSTERESIS)
    }
}

impl Thermostat {
    pub fn new(hysteresis: f32) -> Self {
        Self {
            hysteresis,
            heater: false,
            temp: None,
            temp_target: None,
        }
    }

    /// Should the heater be on?
    pub fn heater(&self) -> bool {
        self.heater
    }

    /// Feeds a new reading and target, returning the heater state
    ///
    /// A missing reading or target leaves the heater as it was.
    #[instrument(skip(self))]
    pub fn update(&mut self, temp: Option<f32>, temp_target: Option<f32>) -> bool {
        if temp.is_some() {
            self.temp = temp;
        }
        self.temp_target = temp_target;

        let (Some(temp), Some(target)) = (self.temp, self.temp_target) else {
            debug!("No reading or target yet, heater stays {}", self.heater);
            return self.heater;
        };

        let heater = if temp <= target - self.hysteresis {
            true
        } else if temp >= target + self.hysteresis {
            false
        } else {
            self.heater
        };

        if heater != self.heater {
            info!(
                "Heater {} at {:.1} (target {:.1})",
                if heater { "on" } else { "off" },
                temp,
                target
            );
        }
        self.heater = heater;
        heater
    }

    /// Resolves the target from `settings` at `at` and updates the heater
    pub fn update_at(
        &mut self,
        settings: &UserSettings,
        at: NaiveDateTime,
        temp: Option<f32>,
    ) -> Result<bool> {
        let target = settings.target_temperature(at)?;
        Ok(self.update(temp, Some(target)))
    }

    pub fn state(&self, at: NaiveDateTime) -> ThermostatState {
        ThermostatState {
            date_time: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            heater: self.heater,
            temp: self.temp,
            temp_target: self.temp_target,
        }
    }
}
