//! ID generation for envelopes and tasks.
//!
//! Grounded on the original Python service's `ulid_generator()`
//! (`original_source/schedulergodx/utils/id_generators.py`): a ULID gives a
//! lexicographically sortable, time-prefixed identifier without a round
//! trip to the store, which matters for envelope `id`s minted before a task
//! row exists.

use ulid::Ulid;

pub fn new_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_sortable_length() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
    }
}
