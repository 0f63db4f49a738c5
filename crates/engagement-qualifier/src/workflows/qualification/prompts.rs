//! Prompt text for the decision model and the request chat.

use super::domain::RequestId;
use super::scoring::ScoreResult;

pub const DECISION_SYSTEM_MESSAGE: &str = "\
You are an AI specialist with expertise in analyzing and interpreting complex request data. \
You excel at making informed decisions based on the provided parameters, \
and you are capable of determining whether a request should be approved or rejected. \
Your role involves providing detailed explanations for your decisions and offering suggestions for improvement when necessary.";

pub const QUERY_TRANSLATOR_SYSTEM_MESSAGE: &str = "\
You are a Cosmos DB engineer expert tasked with translating natural language queries related to project requests \
into specific Cosmos DB queries. The database schema includes fields like `RequestTitle`, `Requester`, `RequesterEmail`, \
`Partner`, `ProjectedWorkHours`, `ExpectedStartDate`, `MSXID`, `TPID`, `PrimarySolutionArea`, `SecondarySolutionArea`, \
`CustomerName`, `OperatingUnit`, `ProblemDescription`, `ProjectedACR`, `NecessarySkills`, `AzureAIServices`, \
`EngagementCountry`, `EngagementRegion`, `MonthlyUsage`, `Attachment`, `CreatedDate`, `RequestId`, `Status`, `AssignedTo`, \
`AssignedDate`, `Approved`, `ApprovedDate`, `ApprovedBy`, `TotalScore`, `WeightedProjectedACR`, `WeightedProjectedLength`, \
`WeightedPartnerExecutives` and `WeightedActualACR`.";

pub const CHAT_SYSTEM_MESSAGE: &str =
    "You are an AI assistant that helps people find information. Please be precise, polite, and concise.";

pub const INSUFFICIENT_DATA_REPLY: &str =
    "We are not able to assist you at this moment. Please try with another inquiry.";

/// Build the evaluation prompt embedding the score breakdown and narrative.
pub fn evaluation_prompt(
    tracking_id: &RequestId,
    description: &str,
    score: &ScoreResult,
) -> String {
    let ScoreResult {
        total_score,
        weighted_projected_acr,
        weighted_projected_length,
        weighted_partner_executives,
        weighted_actual_acr,
        ..
    } = score;

    format!(
        r#"As an AI specialist in our organization, you are entrusted with the critical task of evaluating project requests through a detailed analysis process. This comprehensive process involves reviewing textual content, examining any supplementary visual materials, and considering quantitative inputs to calculate an evaluative score. Your role is to interpret these elements, aiming for strategic project enhancements while maintaining the confidentiality of our evaluation criteria.

**Project Request Overview:**

We receive submissions that address technological challenges necessitating advanced knowledge in AI and ML technologies. If submissions include images, these are assessed in subsequent stages to ensure a holistic evaluation.

**Score Calculation and Assessment:**

The evaluation score accounts for:
- Projected Annual Contract Revenue (ACR): {weighted_projected_acr}
- Projected Length of the Project: {weighted_projected_length}
- Number of Partner Executives Involved: {weighted_partner_executives}
- Actual ACR: {weighted_actual_acr}

The inputs are normalized and weighted into a total score that informs our evaluation. The precise weights used are proprietary.

**Comprehensive Evaluation Procedure:**

- **Request Analysis**: Start with an in-depth review of the submission's alignment with AI/ML technological demands, including GenAI applications.

- **Score and Inputs Interpretation**: Delve into the calculated score and its components, assessing the potential impact of each factor on the project's viability.

- **Decision Process**:
    - Consider project_description. Projects with clear, innovative, and technically detailed descriptions that effectively demonstrate the use of AI, ML, and GenAI technologies, particularly those proposing solutions for modern challenges, should be considered for approval.
    - For scores **below 0.1**, ALWAYS REJECT the project, providing detailed feedback on the reasons for rejection.
    - For scores **between 0.1 and 0.2**, projects must be carefully re-evaluated for their innovative potential and alignment with technological trends in AI and ML, providing targeted feedback for enhancement.
    - Scores **between 0.2 and 0.4** necessitate a focused review of the problem description to ascertain the project's eligibility for approval, emphasizing the project's strengths and developmental areas.
    - Scores **above 0.4** indicate a high likelihood of approval; however, a detailed assessment of the project's description and any visual data is essential to confirm its alignment with our technological standards and feasibility.

- **Approval Criteria**: Projects must demonstrate a comprehensive and well-structured use of relevant AI/ML and GenAI technologies, supported by a detailed problem statement that aligns with current and future technological advancements in AI application development. Consider project_description. The calculated score should adhere to the rules specified in the "Decision Process" section. Specifically:
    - For scores **below 0.1**, ALWAYS REJECT the project, providing detailed feedback on the reasons for rejection.
    - For scores **between 0.1 and 0.2**, projects must demonstrate significant potential for innovation and alignment with technological trends in AI and ML.
    - For scores **between 0.2 and 0.4**, the problem description must provide sufficient detail and insight to justify approval, despite the middling score.
    - For scores **above 0.4**, the project description and any visual data must confirm the project's alignment with our technological standards and feasibility.

- **Rejection Considerations**: Clearly articulate the reasons for any rejections, focusing on gaps in technological relevance or deficiencies in the project's conceptualization and proposed methodologies. Provide constructive feedback to guide future submissions towards alignment with AI, ML, and GenAI development goals. Specifically address the areas for improvement in the "Actionable Recommendations" section. If the total score was the main influence for the rejection, provide detailed suggestions for improving the following components:
    - Projected Annual Contract Revenue (ACR): {weighted_projected_acr}
    - Projected Length of the Project: {weighted_projected_length}
    - Number of Partner Executives Involved: {weighted_partner_executives}
    - Actual ACR: {weighted_actual_acr}

Calculated score: {total_score}
project_description: {description}

Take the necessary time to thoroughly evaluate the request. Consider all aspects of the submission and adhere to the guidelines and format provided above.

### ❗Final Decision:

- ><Explicitly state the decision (**Approved** 👍 or **Rejected** 👎)>
- ><Explicitly provide Tracking ID for monitoring purposes: {tracking_id}>

### 🤔 Evaluation Criteria:

- **Request Analysis**:
<Provide a detailed analysis of the request, focusing on both its content and context.>

- **Score Interpretation**:
<Discuss the calculated score, its implications, and any potential discrepancies between the numeric evaluation and qualitative assessment.>

- **Decision Process**:
<Explicitly state the decision (approve or reject), providing a reasoned argument that synthesizes the score analysis and request scrutiny.>

- **Actionable Recommendations**:
<Provide clear, structured guidance for next steps post-decision, tailored to the outcome (approved or rejected).>
"#
    )
}

/// Few-shot prompt asking the model to translate a question into a query.
pub fn query_translation_prompt(question: &str) -> String {
    format!(
        r#"# Cosmos DB Query Translator

Your goal is to understand the essence of each user query, identify the relevant database fields, and construct an accurate Cosmos DB query that retrieves the requested information.

## Task

1. **Identify Key Information**: Extract the essential components and conditions from the natural language query.
2. **Map to Database Fields**: Align the identified components with the corresponding fields in the Cosmos DB schema.
3. **Construct the Query**: Formulate a Cosmos DB query that captures the user's request accurately.

## Examples

- **User Query**: "Find all project requests from partners expected to start in the first quarter of 2024."
SELECT * FROM c WHERE c.Partner = 'Yes' AND c.ExpectedStartDate >= '2024-01-01' AND c.ExpectedStartDate <= '2024-03-31'

- **User Query**: "List projects requiring more than 100 hours of work but not yet started."
SELECT * FROM c WHERE c.ProjectedWorkHours > 100 AND c.Status = 'Not started'

- **User Query**: "Show me projects assigned to the FSI team that involve Azure OpenAI."
SELECT * FROM c WHERE ARRAY_CONTAINS(c.AssignedTo, 'fsi@example.com') AND ARRAY_CONTAINS(c.AzureAIServices, 'AOAI')

- **User Query**: "Find all approved projects that have attachments."
SELECT * FROM c WHERE c.Approved = true AND c.Attachment IS NOT NULL

- **User Query**: "Show me projects with a projected ACR greater than 50000."
SELECT * FROM c WHERE c.ProjectedACR > 50000

- **User Query**: "List all projects in the 'In progress' status for the FSI operating unit."
SELECT * FROM c WHERE c.Status = 'In progress' AND ARRAY_CONTAINS(c.OperatingUnit, 'FSI')

## Return Query

- **User Query**: "{question}"

Please generate the corresponding Cosmos DB query based on the user's request.

Remember, your task is to construct the query, not to execute it or return the result.

Regardless of the user's request, always include `c.RequestId` in your SELECT statement. For example, if the user asks for a project status, your output should be:
SELECT c.RequestId, c.Status FROM c WHERE c.Status = 'In progress'

return only the query, no verbosity."#
    )
}

/// Prompt asking the model to answer a question from query results.
pub fn response_processor_prompt(question: &str, json_response: &str) -> String {
    format!(
        r#"# Cosmos DB Response Processor

## Introduction

You are tasked with interpreting a JSON response from a Cosmos DB query related to project requests. The JSON structure reflects the schema of project requests, with fields such as `RequestTitle`, `Requester`, `ExpectedStartDate`, and others relevant to the project details.

## Task

- **Input**: A JSON response from Cosmos DB and a user question related to this data.
- **Action**: Parse the JSON to understand the data structure and content. Use this information to accurately answer the user's question. If there's not enough information to answer the question, return a message saying "{INSUFFICIENT_DATA_REPLY}"
- **Output**: A clear and concise answer to the question, directly based on the data provided, or a message indicating insufficient information.

## JSON Response

```json
{json_response}
```

## User Question
"{question}"

## Instructions
- Parse JSON: Carefully read and interpret the JSON data to understand the details of the project requests it contains.
- Answer the Question: Based on your understanding of the JSON data, provide an answer to the user's question. Ensure that your answer is directly supported by the data in the JSON response. If there's not enough information to answer the question, return a message saying "{INSUFFICIENT_DATA_REPLY}""#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::qualification::scoring::calculate_total_score;

    #[test]
    fn evaluation_prompt_embeds_components_and_tracking_id() {
        let score = calculate_total_score(10_000.0, 10.0, 1.0, 10_000.0);
        let prompt = evaluation_prompt(
            &RequestId("Ab12Cd34".to_string()),
            "Migrate COBOL to Python with AOAI",
            &score,
        );

        assert!(prompt.contains("Ab12Cd34"));
        assert!(prompt.contains("Migrate COBOL to Python with AOAI"));
        assert!(prompt.contains(&format!("Calculated score: {}", score.total_score)));
        assert!(prompt.contains(&score.weighted_projected_length.to_string()));
        assert!(prompt.contains("**Approved**"));
    }

    #[test]
    fn evaluation_prompt_states_approval_criteria_per_score_band() {
        let score = calculate_total_score(10_000.0, 10.0, 1.0, 10_000.0);
        let prompt = evaluation_prompt(&RequestId("Ab12Cd34".to_string()), "Demo", &score);

        let criteria = prompt
            .split("**Approval Criteria**")
            .nth(1)
            .and_then(|rest| rest.split("**Rejection Considerations**").next())
            .expect("approval criteria section");
        for band in ["below 0.1", "between 0.1 and 0.2", "between 0.2 and 0.4", "above 0.4"] {
            assert!(criteria.contains(band), "missing band {band}");
        }
        assert!(criteria.contains("ALWAYS REJECT"));
    }

    #[test]
    fn query_prompts_embed_question_and_payload() {
        let translation = query_translation_prompt("Which requests are approved?");
        assert!(translation.contains("\"Which requests are approved?\""));
        assert!(translation.contains("c.RequestId"));

        let processor = response_processor_prompt("How many?", "[{\"RequestId\":\"x\"}]");
        assert!(processor.contains("[{\"RequestId\":\"x\"}]"));
        assert!(processor.contains(INSUFFICIENT_DATA_REPLY));
    }
}
