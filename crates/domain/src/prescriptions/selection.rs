use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Ordered working set of medication names chosen for one dispensing
/// session. A name may appear at most once; comparison ignores case and
/// surrounding whitespace. Discarded on cancel or successful dispense.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MedicationSelectionSet {
    drugs: Vec<String>,
}

impl MedicationSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add if absent, remove if present. Returns whether the name is
    /// selected afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.drugs.remove(index);
                false
            }
            None => {
                self.drugs.push(name.trim().to_string());
                true
            }
        }
    }

    /// Add a name, refusing duplicates. The set is unchanged on refusal.
    pub fn select(&mut self, name: &str) -> Result<(), Error> {
        if self.contains(name) {
            return Err(Error::DuplicateMedication {
                name: name.trim().to_string(),
            });
        }
        self.drugs.push(name.trim().to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(index) = self.position(name) {
            self.drugs.remove(index);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn drugs(&self) -> &[String] {
        &self.drugs
    }

    pub fn clear(&mut self) {
        self.drugs.clear();
    }

    fn position(&self, name: &str) -> Option<usize> {
        let needle = name.trim();
        self.drugs
            .iter()
            .position(|held| held.eq_ignore_ascii_case(needle))
    }
}

// On the wire the set is just its ordered drug list; deserialization
// re-applies the uniqueness invariant.
impl Serialize for MedicationSelectionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.drugs.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MedicationSelectionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut set = MedicationSelectionSet::new();
        for name in &names {
            set.select(name).map_err(serde::de::Error::custom)?;
        }
        Ok(set)
    }
}

/// True when `name` is already held by a slot other than `current`.
///
/// Used while composing a multi-line prescription so the same medication
/// cannot be picked twice across line items; the check runs at selection
/// time, not at submission.
pub fn selected_elsewhere<S: AsRef<str>>(names: &[S], name: &str, current: usize) -> bool {
    let needle = name.trim();
    if needle.is_empty() {
        return false;
    }
    names.iter().enumerate().any(|(slot, held)| {
        slot != current && held.as_ref().trim().eq_ignore_ascii_case(needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_then_removes() {
        let mut set = MedicationSelectionSet::new();
        assert!(set.toggle("Amoxicillin"));
        assert!(set.contains("amoxicillin"));
        assert!(!set.toggle("Amoxicillin"));
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_selection_is_refused_and_set_unchanged() {
        let mut set = MedicationSelectionSet::new();
        set.select("Amoxicillin").unwrap();
        set.select("Ibuprofen").unwrap();

        let before = set.clone();
        let err = set.select(" amoxicillin ").unwrap_err();

        assert!(matches!(err, Error::DuplicateMedication { .. }));
        assert_eq!(set, before);
    }

    #[test]
    fn selection_preserves_order() {
        let mut set = MedicationSelectionSet::new();
        set.select("B").unwrap();
        set.select("A").unwrap();
        set.select("C").unwrap();
        set.remove("A");
        assert_eq!(set.drugs(), ["B", "C"]);
    }

    #[test]
    fn elsewhere_check_ignores_current_slot() {
        let lines = ["Amoxicillin", "", "Ibuprofen"];

        // Same slot re-entering its own value is fine.
        assert!(!selected_elsewhere(&lines, "Amoxicillin", 0));
        // A different slot attempting the same name is not.
        assert!(selected_elsewhere(&lines, "amoxicillin", 1));
        assert!(!selected_elsewhere(&lines, "Paracetamol", 1));
        assert!(!selected_elsewhere(&lines, "", 1));
    }
}
