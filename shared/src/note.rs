//! Note mini-ledger codec
//!
//! Cancellation/reassignment history is persisted on the order as a single
//! bracketed block inside the free-text note field:
//!
//! ```text
//! [API: Cancelado 1)LOC1:REASON1, 2)LOC2:REASON2. Nuevo: DEPOT QTY]
//! ```
//!
//! Each `N)LOC:REASON` is one historical cancellation step (LOC is the
//! human-readable depot alias, not the raw code) and the trailer names the
//! current winning depot by its raw code (`DEPOT`) with its
//! post-reservation remaining quantity. The
//! grammar is an external contract: other systems and operators read the
//! note, so it is preserved bit-for-bit. Internally the block is modeled as
//! [`NoteHistory`] and serialized only at the boundary.

use serde::{Deserialize, Serialize};

/// Opening marker of the encoded block
pub const NOTE_BLOCK_PREFIX: &str = "[API: Cancelado";

/// Hard cap on the encoded block length. When a new step would push the
/// block over the cap, the oldest step is dropped first; the newest step
/// and the winner trailer are always kept.
pub const NOTE_BLOCK_MAX_LEN: usize = 220;

/// Terminal note text when no depot has stock
pub const NO_STOCK_NOTE: &str = "Sin stock en ningún depósito";

/// One historical cancellation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteStep {
    /// 1-based step index as written in the note
    pub index: u32,
    /// Human-readable depot alias (LOC)
    pub depot_alias: String,
    /// Free-text cancellation reason
    pub reason: String,
}

/// The current winning depot trailer (`Nuevo: DEPOT QTY`).
///
/// Unlike the steps, the trailer carries the raw depot code: it is what
/// downstream pickers and the next cancellation read back, so it must
/// resolve to a depot without an alias table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWinner {
    pub depot_code: String,
    /// Remaining quantity at the depot after the reservation
    pub remaining_qty: i64,
}

/// Parsed note-ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHistory {
    pub steps: Vec<NoteStep>,
    pub winner: Option<NoteWinner>,
}

impl NoteHistory {
    /// Decode the ledger block from a full note text.
    ///
    /// Returns an empty history when no block is present. A truncated block
    /// (missing `]`) is parsed as far as it goes; unparseable step entries
    /// are skipped rather than failing the whole decode.
    pub fn decode(note_text: &str) -> Self {
        let Some(start) = note_text.find(NOTE_BLOCK_PREFIX) else {
            return Self::default();
        };

        let after_prefix = &note_text[start + NOTE_BLOCK_PREFIX.len()..];
        let body = match after_prefix.find(']') {
            Some(end) => &after_prefix[..end],
            None => after_prefix,
        };

        let (steps_part, winner_part) = match body.find("Nuevo:") {
            Some(pos) => (&body[..pos], Some(&body[pos + "Nuevo:".len()..])),
            None => (body, None),
        };

        let steps = steps_part
            .trim()
            .trim_end_matches('.')
            .split(", ")
            .filter_map(parse_step)
            .collect();

        let winner = winner_part.and_then(parse_winner);

        Self { steps, winner }
    }

    /// Depot aliases of every historical step (not including the winner)
    pub fn tried_aliases(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.depot_alias.as_str()).collect()
    }

    /// Append the next step. The index continues from the last written
    /// step so indexes stay stable after truncation dropped older ones.
    pub fn push_step(&mut self, depot_alias: impl Into<String>, reason: impl Into<String>) {
        let index = self.steps.last().map(|s| s.index + 1).unwrap_or(1);
        self.steps.push(NoteStep {
            index,
            depot_alias: depot_alias.into(),
            reason: reason.into(),
        });
    }

    /// Encode the canonical block, enforcing [`NOTE_BLOCK_MAX_LEN`].
    ///
    /// While the block exceeds the cap and more than one step remains, the
    /// oldest step is dropped. The newest step always survives.
    pub fn encode(&self) -> String {
        let mut steps: &[NoteStep] = &self.steps;
        loop {
            let block = render_block(steps, self.winner.as_ref());
            if block.len() <= NOTE_BLOCK_MAX_LEN || steps.len() <= 1 {
                return block;
            }
            steps = &steps[1..];
        }
    }
}

/// Remove every existing ledger block from a note, including a
/// partially-truncated one. The note holds exactly one canonical block at
/// a time, never a history of blocks.
pub fn strip_blocks(note_text: &str) -> String {
    let mut out = String::with_capacity(note_text.len());
    let mut rest = note_text;

    while let Some(start) = rest.find(NOTE_BLOCK_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + NOTE_BLOCK_PREFIX.len()..];
        match after.find(']') {
            Some(end) => rest = &after[end + 1..],
            None => {
                // Truncated block runs to the end of the field
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out.trim().to_string()
}

fn render_block(steps: &[NoteStep], winner: Option<&NoteWinner>) -> String {
    let mut block = String::from(NOTE_BLOCK_PREFIX);

    if !steps.is_empty() {
        block.push(' ');
        let joined = steps
            .iter()
            .map(|s| format!("{}){}:{}", s.index, s.depot_alias, s.reason))
            .collect::<Vec<_>>()
            .join(", ");
        block.push_str(&joined);
        block.push('.');
    }

    if let Some(w) = winner {
        block.push_str(&format!(" Nuevo: {} {}", w.depot_code, w.remaining_qty));
    }

    block.push(']');
    block
}

fn parse_step(entry: &str) -> Option<NoteStep> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    let paren = entry.find(')')?;
    let index: u32 = entry[..paren].trim().parse().ok()?;
    let rest = &entry[paren + 1..];
    let colon = rest.find(':')?;

    Some(NoteStep {
        index,
        depot_alias: rest[..colon].trim().to_string(),
        reason: rest[colon + 1..].trim().to_string(),
    })
}

fn parse_winner(part: &str) -> Option<NoteWinner> {
    let part = part.trim();
    // rsplit keeps multi-word locations from older notes intact
    let (code, qty) = part.rsplit_once(' ')?;
    let remaining_qty: i64 = qty.trim().parse().ok()?;

    Some(NoteWinner {
        depot_code: code.trim().to_string(),
        remaining_qty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(steps: &[(&str, &str)], winner: Option<(&str, i64)>) -> NoteHistory {
        let mut h = NoteHistory::default();
        for (alias, reason) in steps {
            h.push_step(*alias, *reason);
        }
        h.winner = winner.map(|(code, qty)| NoteWinner {
            depot_code: code.to_string(),
            remaining_qty: qty,
        });
        h
    }

    #[test]
    fn test_encode_winner_only() {
        let h = history_with(&[], Some(("DEP", 2)));
        assert_eq!(h.encode(), "[API: Cancelado Nuevo: DEP 2]");
    }

    #[test]
    fn test_encode_steps_and_winner() {
        let h = history_with(
            &[("Local Centro", "FALLA"), ("Mundo CABA", "SIN STOCK")],
            Some(("MTGROCA", 4)),
        );
        assert_eq!(
            h.encode(),
            "[API: Cancelado 1)Local Centro:FALLA, 2)Mundo CABA:SIN STOCK. Nuevo: MTGROCA 4]"
        );
    }

    #[test]
    fn test_round_trip_reproduces_tried_set() {
        let h = history_with(
            &[("Local Centro", "FALLA"), ("Mundo CABA", "SIN STOCK")],
            Some(("MTGROCA", 4)),
        );
        let decoded = NoteHistory::decode(&h.encode());
        assert_eq!(decoded, h);
        assert_eq!(decoded.tried_aliases(), vec!["Local Centro", "Mundo CABA"]);
    }

    #[test]
    fn test_decode_ignores_surrounding_text() {
        let note = "entregar después de las 14hs [API: Cancelado 1)DEP:ROTO. Nuevo: MUNDOCAB 1] gracias";
        let decoded = NoteHistory::decode(note);
        assert_eq!(decoded.steps.len(), 1);
        assert_eq!(decoded.steps[0].depot_alias, "DEP");
        assert_eq!(decoded.winner.as_ref().unwrap().depot_code, "MUNDOCAB");
        assert_eq!(decoded.winner.as_ref().unwrap().remaining_qty, 1);
    }

    #[test]
    fn test_decode_tolerates_multi_word_winner_from_old_notes() {
        let decoded = NoteHistory::decode("[API: Cancelado Nuevo: Mundo CABA 3]");
        assert_eq!(decoded.winner.as_ref().unwrap().depot_code, "Mundo CABA");
        assert_eq!(decoded.winner.as_ref().unwrap().remaining_qty, 3);
    }

    #[test]
    fn test_decode_truncated_block() {
        let decoded = NoteHistory::decode("[API: Cancelado 1)DEP:ROTO, 2)Mundo CA");
        assert_eq!(decoded.steps.len(), 2);
        assert_eq!(decoded.steps[0].depot_alias, "DEP");
        assert!(decoded.winner.is_none());
    }

    #[test]
    fn test_append_increases_step_count_and_keeps_newest_under_cap() {
        let mut h = NoteHistory::default();
        for i in 0..30 {
            h.push_step(format!("Depósito {i}"), "MOTIVO LARGO DE CANCELACION");
        }
        h.winner = Some(NoteWinner {
            depot_code: "MTGROCA".to_string(),
            remaining_qty: 7,
        });

        let block = h.encode();
        assert!(block.len() <= NOTE_BLOCK_MAX_LEN);
        // Newest step is always present; oldest were dropped
        assert!(block.contains("Depósito 29"));
        assert!(!block.contains("1)Depósito 0"));
        assert!(block.contains("Nuevo: MTGROCA 7"));
    }

    #[test]
    fn test_indexes_survive_truncation() {
        let mut h = NoteHistory::default();
        for i in 0..5 {
            h.push_step(format!("D{i}"), "X");
        }
        // Simulate a decode of a truncated note that lost the first steps
        let decoded = NoteHistory::decode(&h.encode());
        let mut next = decoded.clone();
        next.push_step("D5", "X");
        assert_eq!(next.steps.last().unwrap().index, 6);
    }

    #[test]
    fn test_strip_removes_all_blocks_including_truncated() {
        let note = "texto [API: Cancelado 1)A:B. Nuevo: C 1] medio [API: Cancelado 1)D:E";
        assert_eq!(strip_blocks(note), "texto  medio");

        let clean = "sin bloque";
        assert_eq!(strip_blocks(clean), "sin bloque");
    }

    #[test]
    fn test_decode_empty_note() {
        let decoded = NoteHistory::decode("");
        assert!(decoded.steps.is_empty());
        assert!(decoded.winner.is_none());
    }
}
