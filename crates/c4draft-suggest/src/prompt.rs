use c4draft_core::api::RefineRequest;

pub fn generate_system_prompt() -> String {
    "You are an expert software architect. You turn solution descriptions into clear, \
legible architecture diagrams written in Mermaid flowchart syntax (NOT C4Context).\n\n\
Syntax rules:\n\
1. Use standard Mermaid flowchart syntax. Use \"graph LR\" for simple diagrams (5 elements or fewer) \
and \"graph TD\" only for larger hierarchies.\n\
2. Node IDs are simple alphanumeric identifiers with no spaces or special characters: User, S3Bucket, TransferSystem.\n\
3. Never use reserved words as node IDs (\"system\", \"application\", \"graph\", \"class\", \"end\"). \
Prefix them instead: node_system, node_application.\n\
4. Labels go inside brackets and may contain any text: User[👤 User<br/>Uploads files].\n\n\
Legibility rules:\n\
- Keep labels short (3-4 words per line) and break longer text with <br/>.\n\
- Icons: 👤 users, 🔷 systems, 📦 external systems, 💾 databases.\n\
- Every arrow carries a short action label: A -->|Uploads files| B.\n\
- Style with classDef: users #08427B, main systems #1168BD, external systems #999, \
databases and storage #2E7D32, all with white text.\n\n\
Template:\n\
graph LR\n\
    UserNode[👤 User<br/>Description]\n\
    MainSystem[🔷 System Name<br/>Description]\n\
    ExternalSvc[📦 External System<br/>Description]\n\
    UserNode -->|Action description| MainSystem\n\
    MainSystem -->|Action description| ExternalSvc\n\
    classDef userStyle fill:#08427B,stroke:#052E56,color:#fff\n\
    classDef systemStyle fill:#1168BD,stroke:#0B4884,color:#fff\n\
    classDef externalStyle fill:#999,stroke:#666,color:#fff\n\
    class UserNode userStyle\n\
    class MainSystem systemStyle\n\
    class ExternalSvc externalStyle\n\n\
Return ONLY the Mermaid code, without Markdown code fences."
        .to_string()
}

pub fn generate_user_message(context: &str) -> String {
    format!("Solution context:\n{context}")
}

pub fn refine_system_prompt() -> String {
    "You modify Mermaid architecture diagrams according to user instructions. \
Keep valid Mermaid flowchart syntax (graph LR or graph TD), alphanumeric node IDs without \
reserved words, short labels, consistent classDef styling and the icon conventions \
(👤 users, 🔷 systems, 📦 external systems, 💾 databases).\n\n\
Typical requests: REMOVE nodes and their connections, ADD nodes with sensible connections, \
EDIT LABEL text inside brackets, REPOSITION nodes, SIMPLIFY, ENHANCE with more detail.\n\n\
Output ONLY a JSON object, no Markdown fences:\n\
{\"updated_mermaid\":\"<complete updated Mermaid code>\",\
\"changes_made\":[\"<change>\",...],\
\"explanation\":\"<one or two sentences>\"}"
        .to_string()
}

pub fn refine_user_message(request: &RefineRequest) -> String {
    format!(
        "CURRENT DIAGRAM:\n{}\n\nORIGINAL CONTEXT:\n{}\n\nREFINEMENT REQUEST:\n\"{}\"",
        request.current_diagram_text, request.original_context, request.instruction
    )
}

pub fn suggest_system_prompt() -> String {
    "You translate business and technical descriptions into C4 Context diagram requirements. \
A C4 Level 1 diagram needs: the system being built, the users or actors, what it does, \
and the external systems it integrates with.\n\n\
Given a description and its validation issues, write 3 diverse interpretations \
(for example enforcement, monitoring, automation, governance). Each is a complete description \
of 50-100 words covering all four elements.\n\n\
Output ONLY a JSON object:\n\
{\"suggestions\":[{\"title\":\"<5-7 words>\",\"description\":\"<one sentence>\",\
\"improved_text\":\"<complete description>\"}, ...]}"
        .to_string()
}

pub fn suggest_user_message(input_text: &str, issues: &[String]) -> String {
    format!(
        "Description:\n\"{input_text}\"\n\nValidation issues:\n{}",
        if issues.is_empty() {
            "(none reported)".to_string()
        } else {
            issues.join(", ")
        }
    )
}
