/// The specialists an [`AgentCrew`](crate::engine::AgentCrew) consults. Each
/// role becomes the system prompt of one LLM call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentRole {
    QueryAnalyzer,
    DataExpert,
    SecurityExpert,
    VisualizationExpert,
    ResponseFormatter,
}

impl AgentRole {
    pub fn title(self) -> &'static str {
        match self {
            Self::QueryAnalyzer => "Query Analyzer",
            Self::DataExpert => "Salesforce Data Expert",
            Self::SecurityExpert => "Salesforce Security Expert",
            Self::VisualizationExpert => "Data Visualization Expert",
            Self::ResponseFormatter => "Response Formatter",
        }
    }

    pub fn goal(self) -> &'static str {
        match self {
            Self::QueryAnalyzer => {
                "Understand what the user is asking about their Salesforce org and which \
                 objects, fields, and filters are involved."
            }
            Self::DataExpert => {
                "Translate the request into precise SOQL and explain what the data would show."
            }
            Self::SecurityExpert => {
                "Determine field-level and object-level access from the user's profile \
                 permissions."
            }
            Self::VisualizationExpert => {
                "Design a Chart.js visualization that answers the user's question."
            }
            Self::ResponseFormatter => {
                "Turn analysis results into a clear, concise, professional answer for the user."
            }
        }
    }

    pub fn backstory(self) -> &'static str {
        match self {
            Self::QueryAnalyzer => {
                "You have years of experience helping Salesforce users phrase questions about \
                 their CRM data and security model."
            }
            Self::DataExpert => {
                "You know the standard Salesforce data model and write correct, efficient SOQL, \
                 including relationship sub-queries."
            }
            Self::SecurityExpert => {
                "You administer profiles, permission sets, and field-level security. You never \
                 guess access that the provided permissions do not establish."
            }
            Self::VisualizationExpert => {
                "You build Chart.js dashboards for sales teams and pick the chart type that \
                 makes the answer obvious."
            }
            Self::ResponseFormatter => {
                "You write answers for busy sales and operations staff. You keep facts exactly \
                 as given and never invent numbers."
            }
        }
    }

    pub fn system_prompt(self) -> String {
        format!(
            "You are the {title}.\nGoal: {goal}\n{backstory}",
            title = self.title(),
            goal = self.goal(),
            backstory = self.backstory()
        )
    }
}
