/*!
 # User settings

 The thermostat's persisted configuration: four temperature set points,
 four daily programs and the weekly schedule that picks a program for each
 day. Packed schedules are stored exactly as the device keeps them and
 decoded through [`crate::daily`] and [`crate::weekly`] on demand.

 Settings serialise to camelCase JSON, e.g.

 ```json
 { "setPoints": [{ "name": "Normal", "tempTarget": 17.0 }, ...],
   "dailySchedules": [{ "name": "Day Off", "schedule": [170, ...] }, ...],
   "weeklySchedule": 8194, ... }
 ```
*/

use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::daily::{self, DAILY_BYTES, DAILY_SLOTS};
use crate::weekly::{self, WEEKLY_MASK};
use crate::{Error, Result};

/// Number of set points and daily programs
pub const TABLE_LEN: usize = 4;

/// Longest allowed name, in bytes
pub const NAME_MAX: usize = 15;

/// Lowest accepted target temperature, in degrees Celsius
pub const TEMP_MIN: f32 = 5.0;

/// Highest accepted target temperature, in degrees Celsius
pub const TEMP_MAX: f32 = 35.0;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > NAME_MAX {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A named target temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPoint {
    pub name: String,
    /// Target temperature in degrees Celsius
    pub temp_target: f32,
}

impl SetPoint {
    pub fn new(name: &str, temp_target: f32) -> Self {
        Self {
            name: name.to_string(),
            temp_target,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if !(TEMP_MIN..=TEMP_MAX).contains(&self.temp_target) {
            return Err(Error::TemperatureOutOfRange(self.temp_target));
        }
        Ok(())
    }
}

/// A daily schedule in its 12-byte packed form
///
/// Deserialising from a JSON array of any other length fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PackedDaily(pub [u8; DAILY_BYTES]);

impl PackedDaily {
    /// Packs 48 slot values
    pub fn from_slots<S: Copy + Into<i64>>(slots: &[S]) -> Result<Self> {
        Self::try_from(daily::encode_bytes(slots)?)
    }

    /// Expands to 48 slot values
    pub fn slots(&self) -> Vec<u8> {
        (0..DAILY_SLOTS).map(|i| self.slot_at(i)).collect()
    }

    pub fn slot_at(&self, index: usize) -> u8 {
        daily::slot_at(&self.0, index)
    }
}

impl TryFrom<Vec<u8>> for PackedDaily {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        let actual = bytes.len();
        let packed: [u8; DAILY_BYTES] = bytes.try_into().map_err(|_| Error::Shape {
            what: "packed daily schedule",
            expected: DAILY_BYTES,
            actual,
        })?;
        Ok(Self(packed))
    }
}

impl From<PackedDaily> for Vec<u8> {
    fn from(packed: PackedDaily) -> Self {
        packed.0.to_vec()
    }
}

/// A named daily program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgram {
    pub name: String,
    pub schedule: PackedDaily,
}

impl DailyProgram {
    pub fn new(name: &str, schedule: PackedDaily) -> Self {
        Self {
            name: name.to_string(),
            schedule,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// Persisted thermostat settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub set_points: Vec<SetPoint>,
    pub daily_schedules: Vec<DailyProgram>,
    /// Packed weekly schedule selecting a daily program per day
    pub weekly_schedule: u16,
    /// Weekly schedule used inside the temporary window
    pub weekly_schedule_temporary: u16,
    /// Start of the temporary window, seconds since the epoch (local time)
    pub temporary_start: i64,
    /// End of the temporary window, exclusive
    pub temporary_end: i64,
    /// Hold the vacation set point regardless of schedule
    pub vacation: bool,
    pub vacation_set_point_index: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        // Slots: 0 home office, 1 normal, 2 sleep, 3 vacation
        //
        // 0000-0700 sleep, 0700-0800 normal, 0800-1700 home office,
        // 1700-2100 normal, 2100-0000 sleep
        let work_from_home = PackedDaily([
            0xaa, 0xaa, 0xaa, 0x5a, 0x00, 0x00, 0x00, 0x00, 0x50, 0x55, 0xa5, 0xaa,
        ]);
        // 0000-0700 sleep, 0700-2100 normal, 2100-0000 sleep
        let at_the_office = PackedDaily([
            0xaa, 0xaa, 0xaa, 0x5a, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0xa5, 0xaa,
        ]);
        // 0000-0800 sleep, 0800-2200 normal, 2200-0000 sleep
        let day_off = PackedDaily([
            0xaa, 0xaa, 0xaa, 0xaa, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0xaa,
        ]);

        Self {
            set_points: vec![
                SetPoint::new("Home Office", 20.0),
                SetPoint::new("Normal", 17.0),
                SetPoint::new("Sleep", 16.0),
                SetPoint::new("Vacation", 14.0),
            ],
            daily_schedules: vec![
                DailyProgram::new("Work from Home", work_from_home),
                DailyProgram::new("At the Office", at_the_office),
                DailyProgram::new("Day Off", day_off),
                DailyProgram::new("Other", day_off),
            ],
            weekly_schedule: 0x2002,
            weekly_schedule_temporary: 0x2002,
            temporary_start: 0,
            temporary_end: 0,
            vacation: false,
            vacation_set_point_index: 3,
        }
    }
}

/// Partial settings update; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub set_points: Option<Vec<SetPoint>>,
    pub daily_schedules: Option<Vec<DailyProgram>>,
    pub weekly_schedule: Option<u16>,
    pub weekly_schedule_temporary: Option<u16>,
    pub temporary_start: Option<i64>,
    pub temporary_end: Option<i64>,
    pub vacation: Option<bool>,
    pub vacation_set_point_index: Option<usize>,
}

impl UserSettings {
    /// Checks every field against the device's limits
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<()> {
        if self.set_points.len() != TABLE_LEN {
            return Err(Error::Shape {
                what: "set points",
                expected: TABLE_LEN,
                actual: self.set_points.len(),
            });
        }
        if self.daily_schedules.len() != TABLE_LEN {
            return Err(Error::Shape {
                what: "daily schedules",
                expected: TABLE_LEN,
                actual: self.daily_schedules.len(),
            });
        }
        for set_point in &self.set_points {
            set_point.validate()?;
        }
        for program in &self.daily_schedules {
            program.validate()?;
        }

        for packed in [self.weekly_schedule, self.weekly_schedule_temporary] {
            if packed & !WEEKLY_MASK != 0 {
                return Err(Error::UnusedBitsSet(packed));
            }
        }

        let (start, end) = (self.temporary_start, self.temporary_end);
        let unset = start == 0 && end == 0;
        if !unset && (start == 0 || end == 0 || start >= end) {
            return Err(Error::InvalidTemporaryWindow { start, end });
        }

        if self.vacation_set_point_index >= TABLE_LEN {
            return Err(Error::IndexOutOfRange {
                what: "vacation set point",
                index: self.vacation_set_point_index,
                len: TABLE_LEN,
            });
        }

        debug!("Settings validated");
        Ok(())
    }

    /// Applies a partial update
    ///
    /// The merged settings are validated before anything is written, so a
    /// rejected update leaves `self` untouched.
    #[instrument(skip(self, update))]
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(set_points) = update.set_points {
            next.set_points = set_points;
        }
        if let Some(daily_schedules) = update.daily_schedules {
            next.daily_schedules = daily_schedules;
        }
        if let Some(packed) = update.weekly_schedule {
            next.weekly_schedule = packed;
        }
        if let Some(packed) = update.weekly_schedule_temporary {
            next.weekly_schedule_temporary = packed;
        }
        if let Some(start) = update.temporary_start {
            next.temporary_start = start;
        }
        if let Some(end) = update.temporary_end {
            next.temporary_end = end;
        }
        if let Some(vacation) = update.vacation {
            next.vacation = vacation;
        }
        if let Some(index) = update.vacation_set_point_index {
            next.vacation_set_point_index = index;
        }

        if let Err(e) = next.validate() {
            warn!("Rejected settings update: {}", e);
            return Err(e);
        }
        *self = next;
        info!("Settings updated");
        Ok(())
    }

    /// Parses and validates settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads settings from a JSON file
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Writes settings to a JSON file
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fs::write(path, self.to_json()?)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Decoded slots of daily program `index`
    pub fn daily_slots(&self, index: usize) -> Result<Vec<u8>> {
        let program = self
            .daily_schedules
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                what: "daily schedule",
                index,
                len: self.daily_schedules.len(),
            })?;
        Ok(program.schedule.slots())
    }

    /// Decoded day slots of the regular weekly schedule
    pub fn weekly_slots(&self) -> Vec<u8> {
        weekly::decode(self.weekly_schedule)
    }

    /// Weekly schedule in effect at `at`
    fn active_weekly(&self, at: NaiveDateTime) -> u16 {
        let t = at.and_utc().timestamp();
        if self.temporary_start <= t && t < self.temporary_end {
            self.weekly_schedule_temporary
        } else {
            self.weekly_schedule
        }
    }

    /// Resolves the target temperature at local time `at`
    ///
    /// Vacation mode wins; otherwise the weekly schedule picks the day's
    /// program and the program's half-hour slot picks the set point.
    #[instrument(skip(self))]
    pub fn target_temperature(&self, at: NaiveDateTime) -> Result<f32> {
        let set_point_index = if self.vacation {
            self.vacation_set_point_index
        } else {
            let program_index = weekly::slot_at(self.active_weekly(at), at.weekday()) as usize;
            let program = self
                .daily_schedules
                .get(program_index)
                .ok_or(Error::IndexOutOfRange {
                    what: "daily schedule",
                    index: program_index,
                    len: self.daily_schedules.len(),
                })?;
            let slot = daily::slot_index(at.hour(), at.minute());
            program.schedule.slot_at(slot) as usize
        };

        let set_point = self
            .set_points
            .get(set_point_index)
            .ok_or(Error::IndexOutOfRange {
                what: "set point",
                index: set_point_index,
                len: self.set_points.len(),
            })?;

        debug!(
            "Target at {} is {} ({:.1})",
            at, set_point.name, set_point.temp_target
        );
        Ok(set_point.temp_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        UserSettings::default().validate().unwrap();
    }

    #[test]
    fn test_default_programs() {
        let settings = UserSettings::default();
        let wfh = settings.daily_slots(0).unwrap();
        assert!(wfh[..14].iter().all(|&s| s == 2));
        assert_eq!(&wfh[14..16], &[1, 1]);
        assert!(wfh[16..34].iter().all(|&s| s == 0));
        assert!(wfh[34..42].iter().all(|&s| s == 1));
        assert!(wfh[42..].iter().all(|&s| s == 2));

        assert_eq!(settings.daily_schedules[2].schedule.0[0], 0xaa);
        assert_eq!(settings.daily_schedules[2].schedule.0[4], 0x55);
        assert_eq!(settings.weekly_slots(), vec![2, 0, 0, 0, 0, 0, 2]);
        assert!(matches!(
            settings.daily_slots(TABLE_LEN),
            Err(Error::IndexOutOfRange { index: TABLE_LEN, .. })
        ));
    }

    #[test]
    fn test_target_temperature_follows_schedule() {
        let settings = UserSettings::default();
        // 2021-02-01 is a Monday
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 3, 0)).unwrap(), 16.0);
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 7, 30)).unwrap(), 17.0);
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 12, 0)).unwrap(), 20.0);
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 20, 59)).unwrap(), 17.0);
        // Sunday runs the day-off program
        assert_eq!(settings.target_temperature(at(2021, 1, 31, 7, 30)).unwrap(), 16.0);
        assert_eq!(settings.target_temperature(at(2021, 1, 31, 12, 0)).unwrap(), 17.0);
    }

    #[test]
    fn test_target_temperature_vacation() {
        let mut settings = UserSettings::default();
        settings.vacation = true;
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 12, 0)).unwrap(), 14.0);
    }

    #[test]
    fn test_target_temperature_temporary_window() {
        let mut settings = UserSettings::default();
        let monday_noon = at(2021, 2, 1, 12, 0);
        let t = monday_noon.and_utc().timestamp();
        settings
            .apply(SettingsUpdate {
                // every day runs the day-off program
                weekly_schedule_temporary: Some(0x2aaa),
                temporary_start: Some(t - 60),
                temporary_end: Some(t + 60),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.target_temperature(monday_noon).unwrap(), 17.0);
        assert_eq!(settings.target_temperature(at(2021, 2, 1, 13, 0)).unwrap(), 20.0);
    }

    #[test]
    fn test_set_point_validation() {
        assert!(SetPoint::new("foo", 16.0).validate().is_ok());
        assert!(matches!(SetPoint::new("", 16.0).validate(), Err(Error::InvalidName(_))));
        assert!(matches!(
            SetPoint::new("this name is far, far, far too long", 16.0).validate(),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            SetPoint::new("foo", -100.0).validate(),
            Err(Error::TemperatureOutOfRange(_))
        ));
        assert!(matches!(
            SetPoint::new("foo", 100.0).validate(),
            Err(Error::TemperatureOutOfRange(_))
        ));
    }

    #[test]
    fn test_apply_rejects_and_keeps_state() {
        let mut settings = UserSettings::default();
        let before = settings.clone();

        for update in [
            SettingsUpdate {
                weekly_schedule: Some(0x4000),
                ..Default::default()
            },
            SettingsUpdate {
                set_points: Some(vec![SetPoint::new("a", 10.0); 3]),
                ..Default::default()
            },
            SettingsUpdate {
                temporary_start: Some(0),
                temporary_end: Some(1612846800),
                ..Default::default()
            },
            SettingsUpdate {
                temporary_start: Some(1612846800),
                temporary_end: Some(1612242000),
                ..Default::default()
            },
            SettingsUpdate {
                vacation_set_point_index: Some(4),
                ..Default::default()
            },
        ] {
            assert!(settings.apply(update).is_err());
            assert_eq!(settings, before);
        }
    }

    #[test]
    fn test_apply_weekly_schedule() {
        let mut settings = UserSettings::default();
        settings
            .apply(SettingsUpdate {
                weekly_schedule: Some(0x2a02),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.weekly_schedule, 0x2a02);
    }

    #[test]
    fn test_json_layout() {
        let json = UserSettings::default().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["weeklySchedule"], 0x2002);
        assert_eq!(value["setPoints"][0]["name"], "Home Office");
        assert_eq!(value["setPoints"][0]["tempTarget"], 20.0);
        assert_eq!(value["dailySchedules"][0]["schedule"].as_array().unwrap().len(), 12);
        assert_eq!(UserSettings::from_json(&json).unwrap(), UserSettings::default());
    }

    #[test]
    fn test_json_rejects_bad_daily_length() {
        let json = r#"{ "name": "foo", "schedule": [0,1,2,3,4,5,6,7,8,9,10] }"#;
        assert!(serde_json::from_str::<DailyProgram>(json).is_err());
        let json = r#"{ "name": "foo", "schedule": [0,1,2,3,4,5,6,7,8,9,10,256] }"#;
        assert!(serde_json::from_str::<DailyProgram>(json).is_err());
        let json = r#"{ "name": "foo", "schedule": [0,1,2,3,4,5,6,7,8,9,10,11] }"#;
        let program: DailyProgram = serde_json::from_str(json).unwrap();
        assert_eq!(program.schedule.0[11], 11);
    }

    #[test]
    fn test_json_rejects_overflowing_weekly() {
        let mut value = serde_json::to_value(UserSettings::default()).unwrap();
        value["weeklySchedule"] = serde_json::json!(0x10000);
        assert!(UserSettings::from_json(&value.to_string()).is_err());
        value["weeklySchedule"] = serde_json::json!(-1);
        assert!(UserSettings::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = UserSettings::default();
        settings.vacation = true;
        settings.save(&path).unwrap();
        assert_eq!(UserSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_packed_daily_from_slots() {
        let mut slots = [0u8; DAILY_SLOTS];
        slots[..4].copy_from_slice(&[1, 2, 3, 0]);
        let packed = PackedDaily::from_slots(&slots).unwrap();
        assert_eq!(packed.0[0], 0x39);
        assert_eq!(packed.slots(), slots.to_vec());
        assert_eq!(packed.slots(), daily::decode_bytes(&packed.0).unwrap());
    }
}
