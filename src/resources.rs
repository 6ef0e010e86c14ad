/// Counselor resource library: a fixed catalog of documents grouped by
/// category.

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResourceCategory {
    Guides,
    Worksheets,
    Training,
    Assessments,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 4] = [
        ResourceCategory::Guides,
        ResourceCategory::Worksheets,
        ResourceCategory::Training,
        ResourceCategory::Assessments,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResourceCategory::Guides => "Guides & Templates",
            ResourceCategory::Worksheets => "Worksheets",
            ResourceCategory::Training => "Training Resources",
            ResourceCategory::Assessments => "Assessments",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ResourceCategory::Guides => {
                "Professional templates and guidance documents for structured therapy sessions"
            }
            ResourceCategory::Worksheets => {
                "Interactive worksheets and exercises for client homework and skill development"
            }
            ResourceCategory::Training => {
                "Professional development materials to enhance your counseling skills"
            }
            ResourceCategory::Assessments => "Standardized assessment tools and outcome measures",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Doc,
}

impl FileType {
    pub fn label(self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Doc => "DOC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub file_url: &'static str,
    pub file_type: FileType,
    pub category: ResourceCategory,
    pub tags: &'static [&'static str],
}

impl Resource {
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

macro_rules! resource {
    ($id:literal, $category:ident, $file_type:ident, $title:literal, $url:literal, $description:literal, [$($tag:literal),*]) => {
        Resource {
            id: $id,
            title: $title,
            description: $description,
            file_url: $url,
            file_type: FileType::$file_type,
            category: ResourceCategory::$category,
            tags: &[$($tag),*],
        }
    };
}

pub static CATALOG: [Resource; 16] = [
    resource!("g1", Guides, Pdf, "First Session Guide", "/resources/first-session-guide.pdf",
        "Comprehensive guide for conducting initial therapy sessions, including intake procedures and essential questions.",
        ["New Clients", "Intake"]),
    resource!("g2", Guides, Pdf, "Treatment Planning Template", "/resources/treatment-plan.pdf",
        "Structured template for creating individualized treatment plans with goal setting and progress tracking.",
        ["Planning", "Documentation"]),
    resource!("g3", Guides, Doc, "Progress Note Templates", "/resources/progress-notes.doc",
        "SOAP and DAP note templates for documenting therapy sessions professionally.",
        ["Documentation", "Professional"]),
    resource!("g4", Guides, Pdf, "Termination Checklist", "/resources/termination.pdf",
        "Guide for properly concluding therapy relationships and ensuring continuity of care.",
        ["Termination", "Best Practices"]),
    resource!("w1", Worksheets, Pdf, "Anxiety Management Toolkit", "/resources/anxiety-toolkit.pdf",
        "Collection of worksheets including breathing exercises, thought records, and anxiety tracking tools.",
        ["Anxiety", "Coping Skills"]),
    resource!("w2", Worksheets, Pdf, "Depression Activity Journal", "/resources/depression-journal.pdf",
        "Daily activity and mood tracking worksheet to help clients monitor and improve their mood.",
        ["Depression", "Monitoring"]),
    resource!("w3", Worksheets, Pdf, "Stress Management Planner", "/resources/stress-planner.pdf",
        "Weekly planner for identifying stressors and implementing coping strategies.",
        ["Stress", "Planning"]),
    resource!("w4", Worksheets, Pdf, "Relationship Communication Exercises", "/resources/communication.pdf",
        "Interactive worksheets for improving communication in relationships.",
        ["Relationships", "Communication"]),
    resource!("t1", Training, Pdf, "Crisis Intervention Training", "/resources/crisis-training.pdf",
        "Comprehensive training materials on handling crisis situations and emergency responses.",
        ["Crisis", "Emergency"]),
    resource!("t2", Training, Pdf, "Ethical Decision Making", "/resources/ethics-training.pdf",
        "Training module on ethical considerations and decision-making in counseling practice.",
        ["Ethics", "Professional Development"]),
    resource!("t3", Training, Pdf, "Cultural Competency Course", "/resources/cultural-competency.pdf",
        "Materials for developing cultural awareness and competency in counseling.",
        ["Culture", "Diversity"]),
    resource!("t4", Training, Pdf, "Telehealth Best Practices", "/resources/telehealth.pdf",
        "Guidelines and training for conducting effective online therapy sessions.",
        ["Online Therapy", "Technology"]),
    resource!("a1", Assessments, Pdf, "Mental Health Assessment Package", "/resources/mental-health-assessment.pdf",
        "Comprehensive collection of mental health screening tools and assessments.",
        ["Screening", "Diagnosis"]),
    resource!("a2", Assessments, Pdf, "Risk Assessment Tools", "/resources/risk-assessment.pdf",
        "Standardized tools for assessing suicide risk and safety planning.",
        ["Risk", "Safety"]),
    resource!("a3", Assessments, Pdf, "Progress Monitoring Scales", "/resources/progress-monitoring.pdf",
        "Validated scales for tracking therapy progress and outcomes.",
        ["Progress", "Outcomes"]),
    resource!("a4", Assessments, Pdf, "Relationship Assessment Tools", "/resources/relationship-assessment.pdf",
        "Assessment tools for evaluating relationship dynamics and attachment styles.",
        ["Relationships", "Attachment"]),
];

/// Catalog entries in `category` (all categories when `None`) whose title,
/// description or tags contain `search`, ignoring case.
pub fn filter_resources(category: Option<ResourceCategory>, search: &str) -> Vec<&'static Resource> {
    let needle = search.trim().to_lowercase();
    CATALOG
        .iter()
        .filter(|resource| category.map_or(true, |c| resource.category == c))
        .filter(|resource| needle.is_empty() || resource.matches(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(resources: Vec<&'static Resource>) -> Vec<&'static str> {
        resources.into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn every_category_has_four_entries() {
        for category in ResourceCategory::ALL {
            assert_eq!(filter_resources(Some(category), "").len(), 4, "{}", category.label());
        }
        assert_eq!(filter_resources(None, "").len(), CATALOG.len());
    }

    #[test]
    fn search_covers_title_description_and_tags() {
        assert_eq!(ids(filter_resources(Some(ResourceCategory::Guides), "TERMINATION")), vec!["g4"]);
        assert_eq!(ids(filter_resources(Some(ResourceCategory::Worksheets), "breathing")), vec!["w1"]);
        assert_eq!(ids(filter_resources(Some(ResourceCategory::Training), "diversity")), vec!["t3"]);
    }

    #[test]
    fn search_without_category_spans_catalog() {
        assert_eq!(ids(filter_resources(None, "relationship")), vec!["g4", "w4", "a4"]);
    }

    #[test]
    fn category_scopes_search() {
        assert!(filter_resources(Some(ResourceCategory::Assessments), "anxiety").is_empty());
    }
}
