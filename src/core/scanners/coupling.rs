use super::SignalScanner;
use crate::core::model::FileRecord;
use crate::core::patterns::COUPLING;
use crate::core::signals::ServiceCoupling;

/// Hardcoded URLs, IP addresses and hostnames pointing at concrete services
pub struct CouplingScanner;

fn is_local(endpoint: &str) -> bool {
    endpoint.starts_with("http://localhost")
        || endpoint.starts_with("https://localhost")
        || endpoint == "127.0.0.1"
}

impl SignalScanner for CouplingScanner {
    type Output = ServiceCoupling;

    fn category(&self) -> &'static str {
        "service_coupling"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> ServiceCoupling {
        let mut coupling = ServiceCoupling::default();
        for kind in COUPLING.names() {
            coupling.services.insert(kind.to_string(), Vec::new());
        }

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let mut found = false;
            for (kind, regexes) in COUPLING.entries() {
                for regex in regexes {
                    let endpoints: Vec<String> = regex
                        .find_iter(content)
                        .map(|m| m.as_str())
                        .filter(|endpoint| !is_local(endpoint))
                        .map(str::to_string)
                        .collect();

                    if !endpoints.is_empty() {
                        coupling.count += endpoints.len() as u64;
                        coupling
                            .services
                            .entry(kind.to_string())
                            .or_default()
                            .extend(endpoints);
                        found = true;
                    }
                }
            }

            if found {
                coupling.files.push(file.path.clone());
            }
        }

        coupling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoints_are_ignored() {
        let files = vec![FileRecord::text(
            "client.py",
            "BASE = 'http://localhost:8080'\nHOST = '127.0.0.1'\n",
        )];

        let coupling = CouplingScanner.scan(&files, 1_000_000);

        assert!(coupling.services["direct_http"].is_empty());
        assert!(coupling.services["hardcoded_ips"].is_empty());
        assert_eq!(coupling.services.len(), 3);
    }

    #[test]
    fn test_remote_endpoints_are_recorded() {
        let files = vec![FileRecord::text(
            "client.py",
            "PAYMENTS = 'https://payments.internal.example'\nCACHE = '10.0.4.12'\n",
        )];

        let coupling = CouplingScanner.scan(&files, 1_000_000);

        assert!(coupling.count >= 2);
        assert_eq!(coupling.services["hardcoded_ips"], vec!["10.0.4.12"]);
        assert_eq!(coupling.files, vec!["client.py"]);
    }
}
