pub const DEFAULT_EDIT: &str = include_str!("../data/prompts/default_edit.txt");
