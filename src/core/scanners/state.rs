use super::{table_hits, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::STATE;
use crate::core::signals::StateManagement;

pub struct StateScanner;

impl SignalScanner for StateScanner {
    type Output = StateManagement;

    fn category(&self) -> &'static str {
        "state_management"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> StateManagement {
        let mut state = StateManagement::default();

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let hits = table_hits(&STATE, content);
            for (kind, count) in &hits {
                match *kind {
                    "stateless" => state.stateless += count,
                    "persistent_state" => state.persistent_state += count,
                    "database_state" => state.database_state += count,
                    _ => {}
                }
            }

            if !hits.is_empty() {
                state.files.push(file.path.clone());
            }
        }

        state
    }
}
