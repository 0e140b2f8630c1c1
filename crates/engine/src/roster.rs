//! The town's seed NPCs.
//!
//! Schedule times are minutes since midnight.

use babel_domain::{Coordinates, DomainError, Npc, NpcId, ScheduleEntry};

pub const TEDDY_ID: NpcId = NpcId::new(8);
pub const ESMERALDA_ID: NpcId = NpcId::new(11);

/// Every NPC registered when the town loads.
pub fn babel_roster() -> Result<Vec<Npc>, DomainError> {
    Ok(vec![teddy()?, esmeralda()?])
}

pub fn teddy() -> Result<Npc, DomainError> {
    let npc = Npc::new(TEDDY_ID, "Teddy", "Cat")?
        .with_greeting(["What do you want? Make it quick."])
        .with_description(
            "Teddy, who insists on being called Theodore, is an intelligent but aloof cat \
             who roams Babel on his own terms. He has no official owner but tolerates Ronny, \
             who feeds him scraps. Though he claims to despise Garbanzo, he secretly watches \
             out for him, making sure the dog doesn't get into trouble. Teddy enjoys observing \
             the town, judging humans from a safe distance, and engaging in silent intellectual \
             battles with Esmeralda.",
        )
        .with_personality(["Aloof", "Intelligent", "Secretly Caring", "Judgmental"])
        .with_schedule(vec![
            ScheduleEntry::new("breakfast", 360, "Restaurant", Coordinates::new(2.0, 2.0)),
            ScheduleEntry::new("wander", 720, "Overworld", Coordinates::new(6.0, 6.0)),
        ])?
        .with_location("Restaurant", Coordinates::new(2.0, 2.0));
    Ok(npc)
}

pub fn esmeralda() -> Result<Npc, DomainError> {
    let npc = Npc::new(ESMERALDA_ID, "Esmeralda", "Pharmacist")?
        .with_greeting(["You seek knowledge... or perhaps something more? Hmm... interesting."])
        .with_description(
            "Esmeralda is the town's enigmatic pharmacist, known for her deep knowledge of both \
             modern medicine and mysterious herbal remedies. Rumors persist that she might be a \
             witch, but she neither confirms nor denies them. She speaks in cryptic riddles and \
             often knows things she was never told, adding to her air of mystery. She takes care \
             of her nephew Ace who was sent to Babel to overcome behavioral issues.",
        )
        .with_personality(["Mysterious", "Aloof", "Intelligent", "Cryptic"])
        .with_schedule(vec![
            ScheduleEntry::new("open shop", 480, "Pharmacy", Coordinates::new(2.0, 2.0)),
            ScheduleEntry::new("evening walk", 1080, "Overworld", Coordinates::new(8.0, 8.0)),
        ])?
        .with_location("Pharmacy", Coordinates::new(2.0, 2.0));
    Ok(npc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_ids_are_unique_and_start_at_first_waypoint() {
        let roster = babel_roster().expect("roster is valid");
        let ids: Vec<NpcId> = roster.iter().map(Npc::id).collect();
        assert_eq!(ids, vec![TEDDY_ID, ESMERALDA_ID]);

        for npc in &roster {
            let first = &npc.schedule()[0];
            assert_eq!(npc.current_location(), first.location);
            assert!(!npc.greeting().is_empty());
        }
    }

    #[test]
    fn teddy_heads_out_at_noon() {
        let mut teddy = teddy().expect("valid");
        assert!(teddy.sync_location(720));
        assert_eq!(teddy.current_location(), "Overworld");
    }
}
