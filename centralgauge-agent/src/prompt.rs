//! Prompt construction for the two supported templates.

use centralgauge_core::{PromptTemplate, TaskManifest, ToolNamingStyle};

/// Assemble the prompt text sent to the agent for `task`, run inside
/// `workspace_path`, using the template and tool-naming style the
/// resolved `AgentConfig` selects.
pub fn build_prompt(
    template: PromptTemplate,
    tool_naming: ToolNamingStyle,
    task: &TaskManifest,
    workspace_path: &str,
) -> String {
    match template {
        PromptTemplate::Universal => build_universal(tool_naming, task, workspace_path),
        PromptTemplate::Legacy => build_legacy(tool_naming, task, workspace_path),
    }
}

fn completion_requirement(tool_naming: ToolNamingStyle, requires_tests: bool) -> String {
    let compile_tool = tool_naming.compile_tool_name();
    if requires_tests {
        let verify_tool = tool_naming.verify_tool_name();
        format!(
            "The task is not complete until `{compile_tool}` reports a success signal AND \
             `{verify_tool}` has been invoked and reports that all tests passed."
        )
    } else {
        format!("The task is not complete until `{compile_tool}` reports a success signal.")
    }
}

fn build_universal(tool_naming: ToolNamingStyle, task: &TaskManifest, workspace_path: &str) -> String {
    let requires_tests = task.requires_tests();
    format!(
        "Task: {task_id}\n\
         Workspace: {workspace_path}\n\
         Requires tests: {requires_tests}\n\n\
         {description}\n\n\
         {requirement}\n",
        task_id = task.id,
        workspace_path = workspace_path,
        requires_tests = requires_tests,
        description = task.description,
        requirement = completion_requirement(tool_naming, requires_tests),
    )
}

fn build_legacy(tool_naming: ToolNamingStyle, task: &TaskManifest, workspace_path: &str) -> String {
    let requires_tests = task.requires_tests();
    let compile_tool = tool_naming.compile_tool_name();
    format!(
        "You are an AL developer working in {workspace_path}.\n\
         Your assignment ({task_id}): {description}\n\
         Write the AL source needed to satisfy the assignment, then call `{compile_tool}` to \
         compile it.\n\
         {requirement}\n",
        workspace_path = workspace_path,
        task_id = task.id,
        description = task.description,
        compile_tool = compile_tool,
        requirement = completion_requirement(tool_naming, requires_tests),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use centralgauge_core::{ExpectedOutcome, TaskId};
    use std::path::PathBuf;

    fn task(test_app: Option<&str>) -> TaskManifest {
        TaskManifest {
            id: TaskId::parse("CG-AL-E008").unwrap(),
            description: "Create a simple table extension".to_string(),
            expected: ExpectedOutcome { compile: true, test_app: test_app.map(PathBuf::from) },
        }
    }

    #[test]
    fn universal_template_mentions_verify_tool_only_when_tests_required() {
        let without_tests = build_prompt(
            PromptTemplate::Universal,
            ToolNamingStyle::Generic,
            &task(None),
            "/workspace",
        );
        assert!(!without_tests.contains("al_verify_task"));

        let with_tests = build_prompt(
            PromptTemplate::Universal,
            ToolNamingStyle::Generic,
            &task(Some("tests/al/easy/CG-AL-E008.Test.al")),
            "/workspace",
        );
        assert!(with_tests.contains("al_verify_task"));
    }

    #[test]
    fn mcp_tool_naming_changes_the_referenced_tool_names() {
        let prompt = build_prompt(
            PromptTemplate::Legacy,
            ToolNamingStyle::Mcp,
            &task(None),
            "/workspace",
        );
        assert!(prompt.contains("mcp__al-tools__al_compile"));
    }
}
