//! README item list rendered from a snapshot

use crate::core::config::ItemConfig;
use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use crate::release::snapshot::InstallationSnapshot;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PROJECT_BASE_URL: &str = "https://modrinth.com";

enum Status<'a> {
  Installed,
  Via(&'a str),
  Failed,
}

/// Category-grouped checklist of every configured item
///
/// Categories appear in the order they are first used in the config.
pub fn render_item_list(items: &[ItemConfig], snapshot: &InstallationSnapshot) -> String {
  let mut status: HashMap<&str, Status<'_>> = HashMap::new();
  for r in &snapshot.successful {
    status.insert(&r.identifier, Status::Installed);
  }
  for r in &snapshot.alternative_installed {
    status.insert(&r.identifier, Status::Via(&r.installed_alternative.identifier));
  }
  for r in &snapshot.failed {
    status.insert(&r.identifier, Status::Failed);
  }

  let mut categories: Vec<&str> = Vec::new();
  for item in items {
    if !categories.contains(&item.category.as_str()) {
      categories.push(&item.category);
    }
  }

  let mut out = String::new();
  for category in categories {
    out.push_str(&format!("### {}\n\n", capitalize(category)));
    for item in items.iter().filter(|i| i.category == category) {
      let link = format!(
        "[{}]({}/{}/{})",
        item.identifier, PROJECT_BASE_URL, item.project_type, item.identifier
      );
      // Items left out of the primary variant don't appear in the snapshot
      let line = match status.get(item.identifier.as_str()) {
        Some(Status::Installed) => format!("- [x] {}\n", link),
        Some(Status::Via(alt)) => format!(
          "- [x] {} (via [{}]({}/{}/{}))\n",
          link, alt, PROJECT_BASE_URL, item.project_type, alt
        ),
        Some(Status::Failed) | None => format!("- [ ] {}\n", link),
      };
      out.push_str(&line);
    }
    out.push('\n');
  }
  out
}

/// Replace everything after `section` with `body`
pub fn replace_section(readme: &str, section: &str, body: &str) -> Option<String> {
  let index = readme.find(section)?;
  Some(format!("{}{}\n\n{}", &readme[..index], section, body))
}

pub fn update_readme(path: &Path, section: &str, items: &[ItemConfig], snapshot: &InstallationSnapshot) -> ReleaseResult<()> {
  let readme = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let body = render_item_list(items, snapshot);
  let updated = replace_section(&readme, section, &body).ok_or_else(|| {
    ReleaseError::with_help(
      format!("Section '{}' not found in {}", section, path.display()),
      "Add the heading to the README or change pack.readme_section",
    )
  })?;
  fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(())
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
