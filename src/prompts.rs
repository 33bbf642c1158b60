//! Analysis menu, prompt templates and the prompt builder.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Returned by [`build_prompt`] when the selection has no template.
pub const INVALID_SELECTION_PROMPT: &str = "Invalid input. No prompt available.";

pub const SYSTEM_INSTRUCTION: &str = "You are a seasoned engineer and data analyst tasked with analyzing maintenance work order data. Your goal is to provide insightful analyses based on the given CSV file, with a focus on optimizing maintenance schedules, understanding efficiency, and improving overall processes. For each analysis, you should always provide an executive summary that is concise and under 1000 words. Include graphs to visualize trends and key findings where applicable, but avoid unnecessary explanations or steps taken. Please ensure that the summary is focused and relevant to the specific prompts provided.";

/// The four analyses offered by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisOption {
    TrendAnalysis = 1,
    ResourceUtilization = 2,
    PerformanceMetrics = 3,
    MaintenanceOptimization = 4,
}

impl AnalysisOption {
    pub fn all() -> [AnalysisOption; 4] {
        [
            Self::TrendAnalysis,
            Self::ResourceUtilization,
            Self::PerformanceMetrics,
            Self::MaintenanceOptimization,
        ]
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::TrendAnalysis),
            2 => Some(Self::ResourceUtilization),
            3 => Some(Self::PerformanceMetrics),
            4 => Some(Self::MaintenanceOptimization),
            _ => None,
        }
    }

    pub fn number(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TrendAnalysis => "Trend Analysis",
            Self::ResourceUtilization => "Resource Utilization",
            Self::PerformanceMetrics => "Performance Metrics",
            Self::MaintenanceOptimization => "Maintenance Optimization",
        }
    }
}

impl fmt::Display for AnalysisOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOptionError {
    NotANumber(String),
    OutOfRange(i64),
}

impl fmt::Display for ParseOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(_) => write!(f, "Invalid input. Please enter a valid number."),
            Self::OutOfRange(_) => {
                write!(f, "Invalid input. Please enter a number between 1 and 4.")
            }
        }
    }
}

impl std::error::Error for ParseOptionError {}

impl FromStr for AnalysisOption {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let n: i64 = trimmed
            .parse()
            .map_err(|_| ParseOptionError::NotANumber(trimmed.to_string()))?;
        Self::from_number(n).ok_or(ParseOptionError::OutOfRange(n))
    }
}

/// Fixed description/context pair bound to a menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub description: &'static str,
    pub context: Option<&'static str>,
}

/// Which wording of the templates to use.
///
/// `Standard` is the terse terminal wording; `Detailed` is the web-form wording, which
/// also asks for specific chart types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateSet {
    #[default]
    Standard,
    Detailed,
}

const STANDARD_TEMPLATES: [PromptTemplate; 4] = [
    PromptTemplate {
        description: "From the uploaded file, analyse the file and do the following. Count the number of ‘72FP’ work orders over days to understand how often preventive maintenance activities are performed. Use Scheduled start column for start date.",
        context: Some("By tracking the frequency of PM activities, organizations can optimize maintenance schedules, allocate resources efficiently, and ensure timely inspections and repairs. Also plot a graph of your analysis."),
    },
    PromptTemplate {
        description: "From the uploaded file, compare columns 'planned Work' vs. 'Actual work' durations for all main work centers aggregating on the 'Operation WorkCenter' field.",
        context: Some("Calculate the percentage difference between planned and actual work durations for each work center to highlight any discrepancies or inefficiencies."),
    },
    PromptTemplate {
        description: "Calculate the average duration of work orders for all 'Functional Location' (from start to finish). 'Scheduled start' and 'Scheduled finish' fields could be used to calculate the planned duration to understand the typical time taken for maintenance activities. Also provide relevant graphs.",
        context: Some("Measuring the average duration provides insights into efficiency and resource utilization. It helps set realistic expectations for work order completion times and informs scheduling decisions."),
    },
    PromptTemplate {
        description: "Given the provided CSV file, your task is to perform the following steps:\nAsk the user for the Functional Location and an Operation WorkCenter.\nOnly use the following columns for further analysis: 'Order Type', 'Operation WorkCenter', 'Functional Location', 'Operation short text', 'Description', 'Total planned costs', 'Total actual costs', 'Scheduled finish', 'Scheduled start'.\nAnalyze the Operation short text and Description in all the orders for the provided Functional Location and Operation WorkCenter.\nSummarize your analysis. If there are no 72FP orders, summarize all the activities done in 72FC orders and also suggest the user to schedule PM if needed.\nBased on your analysis, provide a detailed explanation in natural language of what activities (found in Operation short text and Description) can be performed in the ‘72FP’ work orders to eliminate the need for ‘72FC’ work orders.",
        context: None,
    },
];

const DETAILED_TEMPLATES: [PromptTemplate; 4] = [
    PromptTemplate {
        description: "From the uploaded file, analyze the data and do the following:\nCount the number of ‘72FP’ work orders over days using the 'Scheduled start' column to understand the frequency of preventive maintenance activities.\nPresent the analysis with a line graph showing the trend of PM activities over time (daily or weekly).",
        context: Some("Tracking the frequency of 72FP work orders helps in optimizing maintenance schedules, ensuring timely inspections, and improving resource allocation. The line graph will help visualize patterns and irregularities in preventive maintenance scheduling."),
    },
    PromptTemplate {
        description: "From the uploaded file, compare the 'planned Work' and 'Actual work' durations for each 'Operation WorkCenter', aggregating the data based on the 'Operation WorkCenter' field.",
        context: Some("Calculate the percentage difference between planned and actual work durations for each work center. Additionally, provide a bar chart comparing these durations across all work centers to highlight any discrepancies or inefficiencies."),
    },
    PromptTemplate {
        description: "Calculate the average duration of work orders across all 'Functional Location' fields, using the 'Scheduled start' and 'Scheduled finish' columns to calculate the duration.\nPresent the results with a histogram (bin size of 10) showing the distribution of work order durations and a box plot excluding outliers to highlight the typical duration of maintenance activities.",
        context: Some("Understanding the average duration of work orders provides insights into operational efficiency and resource utilization, allowing for better planning and scheduling of maintenance tasks."),
    },
    PromptTemplate {
        description: "Given the provided CSV file, perform the following steps:\nAsk the user for a specific 'Functional Location' and an 'Operation WorkCenter'.\nAnalyze the 'Operation short text' and 'Description' fields in all the work orders corresponding to the provided Functional Location and Operation WorkCenter.\nSummarize your findings with a brief overview of the most common activities and patterns observed.\nIf no 72FP work orders are found, summarize the activities for 72FC work orders and suggest scheduling preventive maintenance if frequent corrective actions are detected or preventive measures seem necessary.",
        context: None,
    },
];

/// Template for a raw menu number, if one exists.
pub fn template_for(set: TemplateSet, selection: i64) -> Option<&'static PromptTemplate> {
    let option = AnalysisOption::from_number(selection)?;
    let table = match set {
        TemplateSet::Standard => &STANDARD_TEMPLATES,
        TemplateSet::Detailed => &DETAILED_TEMPLATES,
    };
    Some(&table[(option.number() - 1) as usize])
}

/// Builds the opening prompt for a menu selection.
///
/// The system instruction, template description, template context and follow-up are
/// joined by single spaces, skipping the parts that are absent. Unknown selections yield
/// [`INVALID_SELECTION_PROMPT`].
pub fn build_prompt(set: TemplateSet, selection: i64, follow_up: Option<&str>) -> String {
    let Some(template) = template_for(set, selection) else {
        return INVALID_SELECTION_PROMPT.to_string();
    };

    let mut parts = vec![SYSTEM_INSTRUCTION, template.description];
    parts.extend(template.context);
    parts.extend(follow_up.map(str::trim).filter(|s| !s.is_empty()));
    parts.join(" ")
}

/// Sampling overrides sent along with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overrides {
    /// Service-side system prompt; omitted from the payload when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub temperature: f32,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            prompt: None,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            temperature: 0.0,
        }
    }
}

impl Overrides {
    /// The terminal wording also hands the system instruction to the service as its
    /// `prompt` override; the web-form wording sends sampling settings only.
    pub fn for_templates(set: TemplateSet) -> Self {
        match set {
            TemplateSet::Standard => Self {
                prompt: Some(SYSTEM_INSTRUCTION.to_string()),
                ..Self::default()
            },
            TemplateSet::Detailed => Self::default(),
        }
    }
}

/// Menu text shown by the terminal front-end.
pub fn menu_text() -> String {
    let mut text = String::from("Select an option:\n");
    for option in AnalysisOption::all() {
        text.push_str(&format!("{}\n", option));
    }
    text.push_str("Enter the corresponding number (1-4): ");
    text
}
