//! Word input kept in sync with click-selection of tray letters.

use crate::game::{
    letters::Letter,
    tray::{LetterId, Tray},
};

/// One typed or clicked character and the tray letter it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    letter: Letter,
    bound: Option<LetterId>,
}

/// The current word, viewable both as text and as a set of selected tray letters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    slots: Vec<Slot>,
}

impl Selection {
    /// Nothing typed, nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text. Each character binds to the first unselected matching tray letter.
    ///
    /// Characters outside the alphabet are dropped.
    pub fn set_input(&mut self, text: &str, tray: &Tray) {
        self.slots = text
            .chars()
            .filter_map(|c| Letter::from_char(c).ok())
            .map(|letter| Slot { letter, bound: None })
            .collect();
        self.rebind(tray);
    }

    /// Click on a tray letter: select it if free, otherwise drop it from the word.
    pub fn toggle(&mut self, id: LetterId, tray: &Tray) {
        if let Some(position) = self.slots.iter().position(|slot| slot.bound == Some(id)) {
            self.slots.remove(position);
            return;
        }
        if let Some(instance) = tray.get(id) {
            self.slots.push(Slot {
                letter: instance.letter,
                bound: Some(id),
            });
        }
    }

    /// Re-resolve slots whose letter left the tray; bound slots that are still valid stay put.
    pub fn rebind(&mut self, tray: &Tray) {
        let mut taken: Vec<LetterId> = self
            .slots
            .iter()
            .filter_map(|slot| slot.bound)
            .filter(|id| tray.get(*id).is_some())
            .collect();

        for slot in &mut self.slots {
            if slot.bound.is_some_and(|id| tray.get(id).is_some()) {
                continue;
            }
            slot.bound = tray
                .letters()
                .find(|instance| instance.letter == slot.letter && !taken.contains(&instance.id))
                .map(|instance| instance.id);
            if let Some(id) = slot.bound {
                taken.push(id);
            }
        }
    }

    /// The text view of the selection.
    pub fn input(&self) -> String {
        self.slots.iter().map(|slot| slot.letter.as_char()).collect()
    }

    /// Tray letters selected, in word order. Unbound characters are skipped.
    pub fn selected(&self) -> Vec<LetterId> {
        self.slots.iter().filter_map(|slot| slot.bound).collect()
    }

    /// Handles to try first when submitting, position for position.
    ///
    /// Unbound characters get a handle that the tray will not recognise, so binding falls
    /// back to its greedy search for that position only.
    pub fn preferred(&self) -> Vec<LetterId> {
        self.slots
            .iter()
            .map(|slot| slot.bound.unwrap_or(LetterId::UNBOUND))
            .collect()
    }

    /// Whether a tray letter is part of the word.
    pub fn is_selected(&self, id: LetterId) -> bool {
        self.slots.iter().any(|slot| slot.bound == Some(id))
    }

    /// Whether every character is backed by a tray letter.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.bound.is_some())
    }

    /// Whether nothing is typed or selected.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget the word.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
