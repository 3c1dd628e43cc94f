// ABOUTME: Parses and builds console routes of the form `/webpage/{project}{page_path}`
// ABOUTME: Also derives breadcrumb trails for the page a route points at

use crate::path;

const WEBPAGE_SEGMENT: &str = "webpage";

/// A parsed navigation location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// Project segment following `webpage`, if any
    pub project: Option<String>,
    /// Normalized absolute page path inside the project; `""` is the root
    pub page_path: String,
}

/// One link in a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub route: String,
}

impl Route {
    /// Parse a location path.
    ///
    /// Query strings and fragments are ignored and any mount prefix before
    /// the `webpage` segment (such as `/app`) is skipped. A location without
    /// a `webpage` segment has neither project nor page path.
    pub fn parse(location: &str) -> Self {
        let location = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let mut segments = path::segments(location).skip_while(|segment| *segment != WEBPAGE_SEGMENT);
        if segments.next().is_none() {
            return Self::default();
        }

        let Some(project) = segments.next() else {
            return Self::default();
        };

        let mut page_path = String::new();
        for segment in segments {
            page_path = path::join(&page_path, segment);
        }

        Self {
            project: Some(project.to_string()),
            page_path,
        }
    }

    /// Route string for a page in a project
    pub fn for_page(project: &str, page_path: &str) -> String {
        format!(
            "/{WEBPAGE_SEGMENT}/{project}{}",
            path::normalize_path(page_path)
        )
    }

    pub fn is_in_project(&self, project: &str) -> bool {
        self.project.as_deref() == Some(project)
    }

    /// Breadcrumbs from the project root down to the routed page
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let Some(project) = self.project.as_deref() else {
            return Vec::new();
        };

        path::prefixes(&self.page_path)
            .into_iter()
            .map(|prefix| Breadcrumb {
                label: if prefix.is_empty() {
                    project.to_string()
                } else {
                    path::display_name(&prefix).to_string()
                },
                route: Self::for_page(project, &prefix),
            })
            .collect()
    }
}
