//! SMS recipient resolution
//!
//! Close friends with a phone number are the recipients. When there are none,
//! the configured default set is used instead so an alert always has
//! somewhere to go.

use crate::config::DefaultContact;
use crate::records::CloseFriendContact;

/// Where the recipient list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientSource {
    /// The user's close friends
    CloseFriends,
    /// The configured default contact set
    Defaults,
}

/// Phone numbers an alert will be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    /// Unique, trimmed phone numbers in first-seen order
    pub numbers: Vec<String>,
    /// Origin of the list
    pub source: RecipientSource,
}

fn push_unique(numbers: &mut Vec<String>, phone: &str) {
    if !numbers.iter().any(|n| n == phone) {
        numbers.push(phone.to_string());
    }
}

/// Resolve SMS recipients from close friends, falling back to `defaults`
pub fn resolve_recipients(
    close_friends: &[CloseFriendContact],
    defaults: &[DefaultContact],
) -> Recipients {
    let mut numbers = Vec::new();
    for phone in close_friends.iter().filter_map(CloseFriendContact::sms_number) {
        push_unique(&mut numbers, phone);
    }
    if !numbers.is_empty() {
        return Recipients {
            numbers,
            source: RecipientSource::CloseFriends,
        };
    }

    for contact in defaults {
        let phone = contact.phone.trim();
        if !phone.is_empty() {
            push_unique(&mut numbers, phone);
        }
    }
    tracing::debug!(count = numbers.len(), "no close friends with phones, using defaults");
    Recipients {
        numbers,
        source: RecipientSource::Defaults,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SosConfig;

    #[test]
    fn close_friends_win_when_they_have_phones() {
        let friends = vec![
            CloseFriendContact::new("1", "A", Some(" 555-0101 ")),
            CloseFriendContact::new("2", "B", None),
            CloseFriendContact::new("3", "C", Some("555-0101")),
        ];
        let recipients = resolve_recipients(&friends, &SosConfig::default().default_contacts);
        assert_eq!(recipients.source, RecipientSource::CloseFriends);
        assert_eq!(recipients.numbers, vec!["555-0101".to_string()]);
    }

    #[test]
    fn no_friends_falls_back_to_defaults() {
        let defaults = SosConfig::default().default_contacts;
        let recipients = resolve_recipients(&[], &defaults);
        assert_eq!(recipients.source, RecipientSource::Defaults);
        assert!(!recipients.numbers.is_empty());
        assert_eq!(recipients.numbers.len(), defaults.len());
    }

    #[test]
    fn friends_without_phones_fall_back_to_defaults() {
        let friends = vec![CloseFriendContact::new("1", "A", Some(""))];
        let recipients = resolve_recipients(&friends, &SosConfig::default().default_contacts);
        assert_eq!(recipients.source, RecipientSource::Defaults);
    }
}
