//! NPC entity - identity, persona, schedule and conversation history
//!
//! # Design
//!
//! - **Private fields**: descriptive data is fixed after construction; only the
//!   runtime session state and the history change afterwards.
//! - **Append-only history**: messages can be appended, never edited,
//!   reordered or removed.
//! - **Valid by construction**: `new()` rejects empty names and
//!   `with_schedule()` rejects entries that are not time-ordered.
//!   Deserialization goes through the same checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{Message, ScheduleEntry};
use crate::value_objects::Coordinates;
use crate::{DomainError, NpcId};

/// A non-player character.
///
/// # Invariants
///
/// - `name` is never empty
/// - `schedule` is ordered by `time` (ties allowed)
/// - `messages` only grows
///
/// # Example
///
/// ```
/// use babel_domain::{Coordinates, Npc, NpcId, ScheduleEntry};
///
/// let npc = Npc::new(NpcId::new(8), "Teddy", "Cat")
///     .unwrap()
///     .with_greeting(["What do you want? Make it quick."])
///     .with_schedule(vec![
///         ScheduleEntry::new("morning", 0, "Restaurant", Coordinates::new(2.0, 2.0)),
///         ScheduleEntry::new("noon", 720, "Overworld", Coordinates::new(6.0, 6.0)),
///     ])
///     .unwrap();
///
/// assert_eq!(npc.name(), "Teddy");
/// assert_eq!(npc.schedule_entry_at(800).map(|e| e.location.as_str()), Some("Overworld"));
/// assert!(!npc.in_dialogue());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NpcRecord")]
pub struct Npc {
    // Identity
    id: NpcId,
    name: String,
    job: String,

    // Persona (immutable after creation)
    description: String,
    personality: Vec<String>,
    greeting: Vec<String>,

    // Schedule (time-ordered)
    schedule: Vec<ScheduleEntry>,

    // Runtime session state
    in_dialogue: bool,
    current_location: String,
    current_coordinates: Coordinates,

    // Conversation history (append-only)
    messages: Vec<Message>,
}

impl Npc {
    // =========================================================================
    // Constructor / builders
    // =========================================================================

    pub fn new(
        id: NpcId,
        name: impl Into<String>,
        job: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("NPC name cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            job: job.into(),
            description: String::new(),
            personality: Vec::new(),
            greeting: Vec::new(),
            schedule: Vec::new(),
            in_dialogue: false,
            current_location: String::new(),
            current_coordinates: Coordinates::default(),
            messages: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_personality<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.personality = traits.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_greeting<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.greeting = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a schedule. Entries must already be sorted by time.
    pub fn with_schedule(mut self, schedule: Vec<ScheduleEntry>) -> Result<Self, DomainError> {
        for pair in schedule.windows(2) {
            if pair[1].time < pair[0].time {
                return Err(DomainError::ScheduleOutOfOrder {
                    waypoint: pair[1].waypoint.clone(),
                    time: pair[1].time,
                    previous: pair[0].time,
                });
            }
        }
        self.schedule = schedule;
        Ok(self)
    }

    pub fn with_location(mut self, location: impl Into<String>, coordinates: Coordinates) -> Self {
        self.current_location = location.into();
        self.current_coordinates = coordinates;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> NpcId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn job(&self) -> &str {
        &self.job
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn personality(&self) -> &[String] {
        &self.personality
    }

    /// Opening lines shown when a dialogue with this NPC starts.
    #[inline]
    pub fn greeting(&self) -> &[String] {
        &self.greeting
    }

    #[inline]
    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    #[inline]
    pub fn in_dialogue(&self) -> bool {
        self.in_dialogue
    }

    #[inline]
    pub fn current_location(&self) -> &str {
        &self.current_location
    }

    #[inline]
    pub fn current_coordinates(&self) -> Coordinates {
        self.current_coordinates
    }

    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `limit` messages of the history, oldest first.
    pub fn recent_messages(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    // =========================================================================
    // Schedule
    // =========================================================================

    /// The entry in effect at `time`: the last one whose time is not after it.
    ///
    /// Returns `None` before the first entry of the day.
    pub fn schedule_entry_at(&self, time: u32) -> Option<&ScheduleEntry> {
        let idx = self.schedule.partition_point(|entry| entry.time <= time);
        idx.checked_sub(1).map(|i| &self.schedule[i])
    }

    /// Copy the location of the entry in effect at `time` into the runtime
    /// location fields. Returns whether anything changed.
    pub fn sync_location(&mut self, time: u32) -> bool {
        let Some(entry) = self.schedule_entry_at(time) else {
            return false;
        };
        if entry.location == self.current_location && entry.coordinates == self.current_coordinates
        {
            return false;
        }
        let (location, coordinates) = (entry.location.clone(), entry.coordinates);
        self.current_location = location;
        self.current_coordinates = coordinates;
        true
    }

    // =========================================================================
    // Session state
    // =========================================================================

    pub fn begin_dialogue(&mut self) {
        self.in_dialogue = true;
    }

    pub fn end_dialogue(&mut self) {
        self.in_dialogue = false;
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Unvalidated wire shape of [`Npc`].
///
/// `in_dialogue` is not read back: a loaded NPC is never mid-session.
#[derive(Deserialize)]
struct NpcRecord {
    id: NpcId,
    name: String,
    job: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    personality: Vec<String>,
    #[serde(default)]
    greeting: Vec<String>,
    #[serde(default)]
    schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    current_location: String,
    #[serde(default)]
    current_coordinates: Coordinates,
    #[serde(default)]
    messages: Vec<Message>,
}

impl TryFrom<NpcRecord> for Npc {
    type Error = DomainError;

    fn try_from(record: NpcRecord) -> Result<Self, Self::Error> {
        let mut npc = Npc::new(record.id, record.name, record.job)?
            .with_description(record.description)
            .with_personality(record.personality)
            .with_greeting(record.greeting)
            .with_schedule(record.schedule)?
            .with_location(record.current_location, record.current_coordinates);
        npc.messages = record.messages;
        Ok(npc)
    }
}

impl fmt::Display for Npc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {} (#{})", self.name, self.id)?;
        writeln!(f, "Job: {}", self.job)?;
        writeln!(f, "Greeting: {}", self.greeting.join(" / "))?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Personality: {}", self.personality.join(", "))?;
        writeln!(f, "Current Location: {}", self.current_location)?;
        writeln!(f, "Current Coordinates: {}", self.current_coordinates)?;
        writeln!(f, "In Dialogue: {}", self.in_dialogue)?;
        write!(f, "Messages: {}", self.messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teddy() -> Npc {
        Npc::new(NpcId::new(8), "Teddy", "Cat")
            .expect("valid npc")
            .with_schedule(vec![
                ScheduleEntry::new("morning", 0, "Restaurant", Coordinates::new(2.0, 2.0)),
                ScheduleEntry::new("noon", 720, "Overworld", Coordinates::new(6.0, 6.0)),
            ])
            .expect("ordered schedule")
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Npc::new(NpcId::new(1), "   ", "Baker").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn out_of_order_schedule_is_rejected() {
        let err = Npc::new(NpcId::new(1), "Patty", "Baker")
            .expect("valid npc")
            .with_schedule(vec![
                ScheduleEntry::new("late", 900, "Bakery", Coordinates::new(1.0, 1.0)),
                ScheduleEntry::new("early", 300, "Market", Coordinates::new(3.0, 3.0)),
            ])
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::ScheduleOutOfOrder {
                waypoint: "early".to_string(),
                time: 300,
                previous: 900,
            }
        );
    }

    #[test]
    fn schedule_entry_at_picks_latest_started_entry() {
        let npc = teddy();
        assert_eq!(npc.schedule_entry_at(0).map(|e| e.waypoint.as_str()), Some("morning"));
        assert_eq!(npc.schedule_entry_at(719).map(|e| e.waypoint.as_str()), Some("morning"));
        assert_eq!(npc.schedule_entry_at(720).map(|e| e.waypoint.as_str()), Some("noon"));
        assert_eq!(npc.schedule_entry_at(5000).map(|e| e.waypoint.as_str()), Some("noon"));
    }

    #[test]
    fn schedule_entry_at_is_none_before_first_entry() {
        let npc = Npc::new(NpcId::new(2), "Ace", "Student")
            .expect("valid npc")
            .with_schedule(vec![ScheduleEntry::new(
                "school",
                480,
                "School",
                Coordinates::new(4.0, 1.0),
            )])
            .expect("ordered schedule");

        assert!(npc.schedule_entry_at(100).is_none());
    }

    #[test]
    fn sync_location_copies_scheduled_place() {
        let mut npc = teddy().with_location("Restaurant", Coordinates::new(2.0, 2.0));

        assert!(!npc.sync_location(10));
        assert!(npc.sync_location(800));
        assert_eq!(npc.current_location(), "Overworld");
        assert_eq!(npc.current_coordinates(), Coordinates::new(6.0, 6.0));
    }

    #[test]
    fn history_keeps_append_order_including_duplicates() {
        let mut npc = teddy();
        npc.append_message(Message::user("hello"));
        npc.append_message(Message::assistant("What?"));
        npc.append_message(Message::user("hello"));

        let contents: Vec<&str> = npc.messages().iter().map(Message::content).collect();
        assert_eq!(contents, vec!["hello", "What?", "hello"]);
        assert_eq!(npc.recent_messages(2).len(), 2);
        assert_eq!(npc.recent_messages(2)[0].content(), "What?");
        assert_eq!(npc.recent_messages(10).len(), 3);
    }

    #[test]
    fn deserialize_restores_history_but_not_session_flag() {
        let mut npc = teddy();
        npc.append_message(Message::user("hello"));
        npc.begin_dialogue();

        let json = serde_json::to_string(&npc).expect("serialize");
        let loaded: Npc = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(loaded.messages(), npc.messages());
        assert_eq!(loaded.schedule(), npc.schedule());
        assert!(!loaded.in_dialogue());
    }

    #[test]
    fn deserialize_rejects_blank_name() {
        let json = r#"{"id": 3, "name": "  ", "job": "Chef"}"#;
        let err = serde_json::from_str::<Npc>(json).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn deserialize_rejects_unordered_schedule() {
        let json = r#"{
            "id": 3,
            "name": "Ronny",
            "job": "Chef",
            "schedule": [
                {"waypoint": "close", "time": 900, "location": "Restaurant", "coordinates": {"x": 1.0, "y": 1.0}},
                {"waypoint": "open", "time": 300, "location": "Restaurant", "coordinates": {"x": 1.0, "y": 1.0}}
            ]
        }"#;
        assert!(serde_json::from_str::<Npc>(json).is_err());
    }

    #[test]
    fn dialogue_flag_toggles() {
        let mut npc = teddy();
        npc.begin_dialogue();
        assert!(npc.in_dialogue());
        npc.end_dialogue();
        assert!(!npc.in_dialogue());
    }
}
