//! # Primitives
//!
//! Hardcoded runtime constants for the semnet CORE.
//!
//! The graph starts with whatever the knowledge source provides, but the
//! identifiers of well-known nodes and the computational bounds below are
//! compiled in and immutable at runtime.

/// Maximum number of clauses in one template.
///
/// Each clause multiplies the live binding set; templates are written by
/// operations, not end users, so a small bound is enough.
pub const MAX_TEMPLATE_CLAUSES: usize = 64;

/// Maximum number of positional arguments on one action.
pub const MAX_ACTION_ARGUMENTS: usize = 16;

/// Default bound on the dispatcher's wait for a completion signal.
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

/// Maximum length for link text searched by the resolver.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Language used for display texts when nothing else is configured.
pub const DEFAULT_LANGUAGE: &str = "lang_ru";

/// Prefix of ordinal role relations (`rrel_1`, `rrel_2`, ...).
pub const ORDINAL_PREFIX: &str = "rrel_";

/// Build the identifier of the `index`-th ordinal relation (1-based).
#[must_use]
pub fn ordinal_idtf(index: usize) -> String {
    format!("{ORDINAL_PREFIX}{index}")
}

/// Parse an ordinal relation identifier back into its 1-based index.
#[must_use]
pub fn parse_ordinal(idtf: &str) -> Option<usize> {
    idtf.strip_prefix(ORDINAL_PREFIX)?
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
}

// =============================================================================
// WELL-KNOWN IDENTIFIERS
// =============================================================================

/// System identifiers of well-known nodes.
pub mod keynodes {
    // Relations
    pub const NREL_MAIN_IDTF: &str = "nrel_main_idtf";
    pub const NREL_RESULT: &str = "nrel_result";
    pub const NREL_INCIDENCE: &str = "nrel_incidence";
    pub const NREL_IMAGE_SIGN: &str = "nrel_image_sign";
    pub const NREL_INCLUSION: &str = "nrel_inclusion";
    pub const NREL_SECTION_DECOMPOSITION: &str = "nrel_section_decomposition";
    pub const NREL_SC_TEXT_TRANSLATION: &str = "nrel_sc_text_translation";
    pub const RREL_KEY_SC_ELEMENT: &str = "rrel_key_sc_element";
    pub const RREL_EXAMPLE: &str = "rrel_example";
    pub const RREL_MAXIMUM_STUDIED_OBJECT_CLASS: &str = "rrel_maximum_studied_object_class";
    pub const RREL_NOT_MAXIMUM_STUDIED_OBJECT_CLASS: &str =
        "rrel_not_maximum_studied_object_class";

    // Action lifecycle
    pub const ACTION: &str = "action";
    pub const ACTION_INITIATED: &str = "action_initiated";
    pub const ACTION_FINISHED: &str = "action_finished";
    pub const ACTION_FINISHED_SUCCESSFULLY: &str = "action_finished_successfully";
    pub const ACTION_FINISHED_UNSUCCESSFULLY: &str = "action_finished_unsuccessfully";

    // Process-scheme roles
    pub const PROCEDURE_STARTING_IMAGE: &str = "procedure_starting_image";
    pub const STARTING_OF_PARALLEL_SEQUENCE_EXECUTION_IMAGE: &str =
        "starting_of_parallel_sequence_execution_image";
    pub const UNIT_PROCEDURE_IMAGE: &str = "unit_procedure_image";
    pub const ALLOCATION_ELEMENT_IMAGE: &str = "allocation_element_image";
    pub const PROCEDURE_FINISHING_IMAGE: &str = "procedure_finishing_image";

    // Languages
    pub const LANG_RU: &str = "lang_ru";
    pub const LANG_EN: &str = "lang_en";

    /// Relations created as `NodeKind::Relation` by bootstrap.
    pub const RELATIONS: &[&str] = &[
        NREL_MAIN_IDTF,
        NREL_RESULT,
        NREL_INCIDENCE,
        NREL_IMAGE_SIGN,
        NREL_INCLUSION,
        NREL_SECTION_DECOMPOSITION,
        NREL_SC_TEXT_TRANSLATION,
        RREL_KEY_SC_ELEMENT,
        RREL_EXAMPLE,
        RREL_MAXIMUM_STUDIED_OBJECT_CLASS,
        RREL_NOT_MAXIMUM_STUDIED_OBJECT_CLASS,
    ];

    /// Classes created as `NodeKind::Class` by bootstrap.
    pub const CLASSES: &[&str] = &[
        ACTION,
        ACTION_INITIATED,
        ACTION_FINISHED,
        ACTION_FINISHED_SUCCESSFULLY,
        ACTION_FINISHED_UNSUCCESSFULLY,
        PROCEDURE_STARTING_IMAGE,
        STARTING_OF_PARALLEL_SEQUENCE_EXECUTION_IMAGE,
        UNIT_PROCEDURE_IMAGE,
        ALLOCATION_ELEMENT_IMAGE,
        PROCEDURE_FINISHING_IMAGE,
        LANG_RU,
        LANG_EN,
    ];
}

/// Identifiers of the registered search operations.
pub mod operations {
    pub const FIND_INFO: &str = "action_find_info";
    pub const FIND_DESCRIPTION: &str = "action_find_description";
    pub const FIND_KEY_SC_ELEMENT: &str = "action_find_key_sc_element";
    pub const FIND_MAX_CLASS: &str = "action_find_max_class";
    pub const FIND_NOT_MAX_CLASS: &str = "action_find_not_max_class";
    pub const FIND_IN_DECOMPOSITIONS: &str = "action_find_in_decompositions";
    pub const FIND_PARENT_DECOMPOSITION: &str = "action_find_parent_decomposition";
    pub const FIND_INCLUDED_CHILDREN: &str = "action_find_included_children";
    pub const FIND_INCLUDED_IN_PARENTS: &str = "action_find_included_in_parents";
    pub const FIND_STAGES_LIST: &str = "action_find_stages_list";
}
