use super::SignalScanner;
use crate::core::model::FileRecord;
use crate::core::patterns::DEPENDENCY_MANIFESTS;
use crate::core::signals::DependencyManagement;

/// Dependency manifests, matched by file name only
pub struct DependencyScanner;

fn manifest_matches(manifest: &str, file_name: &str) -> bool {
    match manifest.strip_prefix('*') {
        Some(suffix) => file_name.ends_with(suffix),
        None => manifest == file_name,
    }
}

impl SignalScanner for DependencyScanner {
    type Output = DependencyManagement;

    fn category(&self) -> &'static str {
        "dependency_management"
    }

    fn scan(&self, files: &[FileRecord], _ceiling: usize) -> DependencyManagement {
        let mut deps = DependencyManagement::default();

        for file in files {
            let file_name = file.file_name();
            for (system, manifests) in DEPENDENCY_MANIFESTS {
                for manifest in manifests.iter() {
                    if manifest_matches(manifest, file_name) {
                        deps.has_dependency_management = true;
                        *deps.dependency_systems.entry(system.to_string()).or_insert(0) += 1;
                        deps.dependency_files.push(file.path.clone());
                    }
                }
            }
        }

        deps
    }
}
