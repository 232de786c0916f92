use super::SignalScanner;
use crate::core::model::FileRecord;
use crate::core::patterns::ENV_VARS;
use crate::core::signals::EnvironmentVariables;

/// Environment variable reads across common languages and config syntaxes
pub struct EnvironmentScanner;

impl SignalScanner for EnvironmentScanner {
    type Output = EnvironmentVariables;

    fn category(&self) -> &'static str {
        "environment_variables"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> EnvironmentVariables {
        let mut env = EnvironmentVariables::default();

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let mut found = false;
            for regex in ENV_VARS.iter() {
                for caps in regex.captures_iter(content) {
                    env.count += 1;
                    if let Some(name) = caps.get(1) {
                        env.variables.insert(name.as_str().to_string());
                    }
                    found = true;
                }
            }

            if found {
                env.files.push(file.path.clone());
            }
        }

        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_every_read_and_collects_names() {
        let files = vec![
            FileRecord::text(
                "server.js",
                "const port = process.env.PORT;\nconst db = process.env.DATABASE_URL;\nconst p2 = process.env.PORT;\n",
            ),
            FileRecord::text("docker-compose.yml", "image: app:${TAG}\n"),
            FileRecord::text("notes.txt", "nothing here\n"),
        ];

        let env = EnvironmentScanner.scan(&files, 1_000_000);

        assert_eq!(env.count, 4);
        assert_eq!(env.variables.len(), 3);
        assert_eq!(env.files, vec!["server.js", "docker-compose.yml"]);
    }
}
