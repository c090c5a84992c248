use crate::models::{Frequency, Group, Habit};

/// Which top-level tab a habit is listed under.
///
/// Target habits follow their (target) frequency. Schedule habits use a fixed
/// table: the daily tab holds everything except yearly habits, the monthly
/// tab holds the yearly ones, and the yearly tab holds none.
pub fn belongs_to_group(habit: &Habit, group: Group) -> bool {
    if habit.is_target() {
        return target_group(&habit.effective_frequency()) == Some(group);
    }
    let frequency = habit
        .frequency
        .as_ref()
        .filter(|frequency| !frequency.is_blank())
        .cloned()
        .unwrap_or(Frequency::Daily);
    schedule_group_contains(group, &frequency)
}

fn target_group(frequency: &Frequency) -> Option<Group> {
    match frequency {
        Frequency::Daily => Some(Group::Daily),
        Frequency::Weekly | Frequency::Biweekly => Some(Group::Weekly),
        Frequency::Monthly => Some(Group::Monthly),
        Frequency::Yearly => Some(Group::Yearly),
        Frequency::Unknown(_) => None,
    }
}

fn schedule_group_contains(group: Group, frequency: &Frequency) -> bool {
    match group {
        Group::Daily => matches!(
            frequency,
            Frequency::Daily | Frequency::Weekly | Frequency::Biweekly | Frequency::Monthly
        ),
        Group::Weekly => *frequency == Frequency::Weekly,
        Group::Monthly => *frequency == Frequency::Yearly,
        Group::Yearly => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(frequency: &str) -> Habit {
        Habit {
            frequency: Some(Frequency::from(frequency)),
            ..Habit::default()
        }
    }

    fn target(frequency: &str) -> Habit {
        Habit {
            target: Some(5.0),
            frequency: Some(Frequency::Daily),
            target_frequency: Some(Frequency::from(frequency)),
            ..Habit::default()
        }
    }

    fn groups_of(habit: &Habit) -> Vec<Group> {
        Group::ALL
            .into_iter()
            .filter(|group| belongs_to_group(habit, *group))
            .collect()
    }

    #[test]
    fn schedule_habit_table() {
        assert_eq!(groups_of(&schedule("daily")), vec![Group::Daily]);
        assert_eq!(
            groups_of(&schedule("weekly")),
            vec![Group::Daily, Group::Weekly]
        );
        assert_eq!(groups_of(&schedule("biweekly")), vec![Group::Daily]);
        assert_eq!(groups_of(&schedule("monthly")), vec![Group::Daily]);
        assert_eq!(groups_of(&schedule("yearly")), vec![Group::Monthly]);
        assert!(groups_of(&schedule("whenever")).is_empty());
        assert_eq!(groups_of(&Habit::default()), vec![Group::Daily]);
    }

    #[test]
    fn target_habit_follows_target_frequency() {
        assert_eq!(groups_of(&target("daily")), vec![Group::Daily]);
        assert_eq!(groups_of(&target("weekly")), vec![Group::Weekly]);
        assert_eq!(groups_of(&target("biweekly")), vec![Group::Weekly]);
        assert_eq!(groups_of(&target("monthly")), vec![Group::Monthly]);
        assert_eq!(groups_of(&target("yearly")), vec![Group::Yearly]);
    }

    #[test]
    fn target_habit_without_target_frequency_uses_frequency() {
        let habit = Habit {
            target: Some(2.0),
            frequency: Some(Frequency::Monthly),
            ..Habit::default()
        };
        assert_eq!(groups_of(&habit), vec![Group::Monthly]);
    }
}
