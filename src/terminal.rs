// The command-chain executor. Owns the in-memory filesystem, the storage
// adapter, the current-directory cursor, the prompt and the command
// history. The presentation layer hands raw lines in and gets ordered
// results plus a prompt string back; everything runs synchronously to
// completion.

use tracing::instrument;

use crate::errors::Result;
use crate::fsystem::{is_valid_name, File, FileSystem, FolderId};
use crate::parser::{parse_line, Token};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub exit_status: i32,
    pub output: Vec<String>,
}

impl CommandResult {
    pub fn success(output: Vec<String>) -> CommandResult {
        CommandResult {
            exit_status: 0,
            output,
        }
    }

    pub fn failure(message: String) -> CommandResult {
        CommandResult {
            exit_status: 1,
            output: vec![message],
        }
    }
}

pub struct Terminal {
    fs: FileSystem,
    storage: Storage,
    current: FolderId,
    prompt: String,
    history: Vec<String>,
    cycled: Option<usize>,
}

impl Terminal {
    /// Restore a session from storage. Absent or corrupted stored data
    /// falls back to a fresh root-only filesystem rather than failing.
    pub fn load(storage: Storage) -> Result<Terminal> {
        let fs = match storage.load_tree()? {
            Some(fs) => fs,
            None => {
                tracing::info!("No stored filesystem found, starting fresh");
                FileSystem::new()
            }
        };
        let root = fs.root();
        let mut terminal = Terminal {
            fs,
            storage,
            current: root,
            prompt: String::new(),
            history: Vec::new(),
            cycled: None,
        };
        terminal.set_current(root);
        Ok(terminal)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    fn set_current(&mut self, dir: FolderId) {
        self.current = dir;
        self.prompt = format!("[user@vterm {}]$ ", self.fs.folder(dir).name());
    }

    /// Execute one submitted line: one result per `;`-separated chain, in
    /// order. The raw line always lands in history, whatever the outcome.
    #[instrument(skip(self))]
    pub fn process_line(&mut self, line: &str) -> Vec<CommandResult> {
        self.cycled = None;
        self.history.push(line.to_string());
        parse_line(line)
            .iter()
            .map(|chain| self.process_chain(chain))
            .collect()
    }

    fn process_chain(&mut self, chain: &[Token]) -> CommandResult {
        let mut pending_input = String::new();
        let mut result = CommandResult::success(Vec::new());
        for token in chain {
            if token.is_operator {
                result = self.handle_operator(&pending_input, token);
            } else {
                match self.run_builtin(&token.command, &pending_input, &token.args) {
                    Some(r) => {
                        // This join is the pipe: the next command sees the
                        // previous output as its input text.
                        pending_input = r.output.join("\n");
                        result = r;
                    }
                    // An unknown command kills the rest of this chain only;
                    // sibling chains still run.
                    None => {
                        return CommandResult::failure(format!(
                            "{}: command not found",
                            token.command
                        ));
                    }
                }
            }
        }
        result
    }

    fn run_builtin(&mut self, name: &str, input: &str, args: &[String]) -> Option<CommandResult> {
        let result = match name {
            "touch" => self.touch(args),
            "mkdir" => self.mkdir(args),
            "rm" => self.rm(args),
            "ls" => self.ls(args),
            "cd" => self.cd(args),
            "pwd" => self.pwd(args),
            "cat" => self.cat(args),
            "echo" => self.echo(input, args),
            "vi" => self.vi(args),
            _ => return None,
        };
        Some(result)
    }

    fn handle_operator(&mut self, input: &str, token: &Token) -> CommandResult {
        match token.command.as_str() {
            // The input threading already happened; a pipe just carries
            // the pending text forward.
            "|" => {
                if input.is_empty() {
                    CommandResult::success(Vec::new())
                } else {
                    CommandResult::success(vec![input.to_string()])
                }
            }
            ">" => {
                self.redirect(input, token.args.first(), false);
                CommandResult::success(Vec::new())
            }
            ">>" => {
                self.redirect(input, token.args.first(), true);
                CommandResult::success(Vec::new())
            }
            other => {
                tracing::debug!("Operator '{}' not found", other);
                CommandResult {
                    exit_status: 1,
                    output: Vec::new(),
                }
            }
        }
    }

    // Redirects only ever write into files that already exist; a missing
    // folder or file silently drops the write.
    fn redirect(&mut self, input: &str, target: Option<&String>, append: bool) {
        let Some(target) = target else { return };
        let (dir, name) = match target.rsplit_once('/') {
            Some((folder_path, name)) => {
                match self.fs.resolve(self.current, folder_path) {
                    Ok(dir) => (dir, name),
                    Err(_) => return,
                }
            }
            None => (self.current, target.as_str()),
        };
        let key = self.fs.file_key(dir, name);
        let Some(file) = self.fs.get_file_mut(dir, name) else {
            return;
        };
        if append {
            file.text.push_str(input);
        } else {
            file.text = input.to_string();
        }
        let text = file.text.clone();
        self.persist_file(&key, &text);
    }

    #[instrument(skip(self))]
    fn touch(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::failure("usage: touch [file]".to_string());
        };
        if !is_valid_name(name) {
            return CommandResult::failure(format!("\"{}\" is not a valid name", name));
        }
        if self.fs.contains_file(self.current, name) || self.fs.contains_folder(self.current, name)
        {
            return CommandResult::failure(format!(
                "\"{}\" already exists in current directory",
                name
            ));
        }
        let key = self.fs.file_key(self.current, name);
        self.fs
            .add_file(self.current, File::new(name.clone(), String::new()));
        self.persist_file(&key, "");
        self.persist_tree();
        CommandResult::success(Vec::new())
    }

    #[instrument(skip(self))]
    fn mkdir(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::failure("usage: mkdir [folder]".to_string());
        };
        if !is_valid_name(name) {
            return CommandResult::failure(format!("\"{}\" is not a valid name", name));
        }
        if self.fs.contains_folder(self.current, name) || self.fs.contains_file(self.current, name)
        {
            return CommandResult::failure(format!(
                "\"{}\" already exists in current directory",
                name
            ));
        }
        self.fs.add_child_folder(self.current, name);
        self.persist_tree();
        CommandResult::success(Vec::new())
    }

    #[instrument(skip(self))]
    fn rm(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::failure("usage: rm [file|folder]".to_string());
        };
        if self.fs.contains_file(self.current, name) {
            // Drop the persisted content before the tree reference; better
            // an orphaned key than a tree entry with no content.
            let key = self.fs.file_key(self.current, name);
            if let Err(e) = self.storage.remove_file_text(&key) {
                tracing::error!("Failed to remove persisted content for {}: {}", key, e);
            }
            self.fs.remove_file(self.current, name);
        } else if self.fs.contains_folder(self.current, name) {
            self.fs.remove_folder(self.current, name);
        } else {
            return CommandResult::failure(format!(
                "\"{}\" does not exist in current directory",
                name
            ));
        }
        self.persist_tree();
        CommandResult::success(Vec::new())
    }

    fn ls(&mut self, _args: &[String]) -> CommandResult {
        let mut entries: Vec<String> = self
            .fs
            .child_folder_names(self.current)
            .iter()
            .map(|name| format!("{}/", name))
            .collect();
        entries.extend(
            self.fs
                .file_names(self.current)
                .iter()
                .map(|name| name.to_string()),
        );
        if entries.is_empty() {
            return CommandResult::success(Vec::new());
        }
        CommandResult::success(vec![entries.join(" ")])
    }

    #[instrument(skip(self))]
    fn cd(&mut self, args: &[String]) -> CommandResult {
        let Some(path) = args.first() else {
            return CommandResult::failure("usage: cd [folder path]".to_string());
        };
        match self.fs.resolve(self.current, path) {
            Ok(dir) => {
                self.set_current(dir);
                CommandResult::success(Vec::new())
            }
            Err(e) => e.into(),
        }
    }

    fn pwd(&self, _args: &[String]) -> CommandResult {
        CommandResult::success(vec![self.fs.full_name(self.current)])
    }

    fn cat(&self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::failure("usage: cat [file]".to_string());
        };
        match self.fs.get_file(self.current, name) {
            Some(file) => {
                CommandResult::success(file.text.split('\n').map(str::to_string).collect())
            }
            None => CommandResult::failure(format!(
                "file \"{}\" does not exist in current directory",
                name
            )),
        }
    }

    fn echo(&self, _input: &str, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return CommandResult::success(Vec::new());
        }
        CommandResult::success(vec![args.join(" ")])
    }

    fn vi(&self, _args: &[String]) -> CommandResult {
        CommandResult::failure("vi not implemented".to_string())
    }

    fn persist_tree(&self) {
        if let Err(e) = self.storage.save_tree(&self.fs) {
            tracing::error!("Failed to persist folder tree: {}", e);
        }
    }

    fn persist_file(&self, key: &str, text: &str) {
        if let Err(e) = self.storage.save_file_text(key, text) {
            tracing::error!("Failed to persist file content for {}: {}", key, e);
        }
    }

    /// Recall a history entry, stepping backward (`up = true`) or forward.
    /// Returns `None` at either boundary, or when not browsing and moving
    /// down; the caller leaves its edit buffer unchanged in that case.
    pub fn cycle_command(&mut self, up: bool) -> Option<&str> {
        if up {
            self.cycle_up()
        } else {
            self.cycle_down()
        }
    }

    fn cycle_up(&mut self) -> Option<&str> {
        let next = match self.cycled {
            None => self.history.len().checked_sub(1)?,
            Some(0) => return None,
            Some(index) => index - 1,
        };
        self.cycled = Some(next);
        Some(&self.history[next])
    }

    fn cycle_down(&mut self) -> Option<&str> {
        let next = self.cycled? + 1;
        if next >= self.history.len() {
            return None;
        }
        self.cycled = Some(next);
        Some(&self.history[next])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_terminal() -> Terminal {
        Terminal::load(Storage::temporary().unwrap()).unwrap()
    }

    fn ok_empty(result: &CommandResult) {
        assert_eq!(result.exit_status, 0);
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_end_to_end_chain_results() {
        let mut term = test_terminal();
        let results = term.process_line("mkdir docs; cd docs; touch a.txt; ls");
        assert_eq!(results.len(), 4);
        ok_empty(&results[0]);
        ok_empty(&results[1]);
        ok_empty(&results[2]);
        assert_eq!(results[3], CommandResult::success(vec!["a.txt".to_string()]));
    }

    #[test]
    fn test_ls_lists_folders_then_files() {
        let mut term = test_terminal();
        term.process_line("touch a.txt");
        term.process_line("mkdir docs");
        let results = term.process_line("ls");
        assert_eq!(results[0].output, vec!["docs/ a.txt".to_string()]);
        // Idempotent on an unmodified directory
        let again = term.process_line("ls");
        assert_eq!(again[0].output, vec!["docs/ a.txt".to_string()]);
    }

    #[test]
    fn test_ls_empty_directory_has_no_output() {
        let mut term = test_terminal();
        let results = term.process_line("ls");
        ok_empty(&results[0]);
    }

    #[test]
    fn test_command_not_found_terminates_chain_only() {
        let mut term = test_terminal();
        let results = term.process_line("frobnicate; pwd");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].exit_status, 1);
        assert_eq!(
            results[0].output,
            vec!["frobnicate: command not found".to_string()]
        );
        assert_eq!(results[1].output, vec!["~".to_string()]);
    }

    #[test]
    fn test_touch_usage_and_collision() {
        let mut term = test_terminal();
        let results = term.process_line("touch");
        assert_eq!(results[0], CommandResult::failure("usage: touch [file]".to_string()));

        term.process_line("touch a.txt");
        let results = term.process_line("touch a.txt");
        assert_eq!(results[0].exit_status, 1);
        assert_eq!(
            results[0].output,
            vec!["\"a.txt\" already exists in current directory".to_string()]
        );

        let results = term.process_line("mkdir a.txt");
        assert_eq!(results[0].exit_status, 1);
    }

    #[test]
    fn test_create_rejects_invalid_names() {
        let mut term = test_terminal();
        let results = term.process_line("mkdir a*b");
        assert_eq!(results[0].exit_status, 1);
        let results = term.process_line("ls");
        ok_empty(&results[0]);
    }

    #[test]
    fn test_cd_and_pwd() {
        let mut term = test_terminal();
        term.process_line("mkdir docs");
        term.process_line("cd docs");
        assert_eq!(term.prompt(), "[user@vterm docs]$ ");
        let results = term.process_line("pwd");
        assert_eq!(results[0].output, vec!["~/docs".to_string()]);

        term.process_line("cd ..");
        let results = term.process_line("pwd");
        assert_eq!(results[0].output, vec!["~".to_string()]);

        let results = term.process_line("cd nowhere");
        assert_eq!(
            results[0],
            CommandResult::failure("folder path \"nowhere\" does not exist".to_string())
        );
    }

    #[test]
    fn test_rm_file_and_folder() {
        let mut term = test_terminal();
        term.process_line("touch a.txt");
        term.process_line("mkdir docs");
        ok_empty(&term.process_line("rm a.txt")[0]);
        ok_empty(&term.process_line("rm docs")[0]);
        ok_empty(&term.process_line("ls")[0]);

        let results = term.process_line("rm ghost");
        assert_eq!(
            results[0],
            CommandResult::failure("\"ghost\" does not exist in current directory".to_string())
        );
    }

    #[test]
    fn test_cat_requires_existing_file() {
        let mut term = test_terminal();
        let results = term.process_line("cat");
        assert_eq!(results[0], CommandResult::failure("usage: cat [file]".to_string()));

        let results = term.process_line("cat ghost");
        assert_eq!(results[0].exit_status, 1);
    }

    #[test]
    fn test_echo_joins_args() {
        let mut term = test_terminal();
        let results = term.process_line("echo hello   world");
        assert_eq!(results[0], CommandResult::success(vec!["hello world".to_string()]));
        let results = term.process_line("echo");
        ok_empty(&results[0]);
    }

    #[test]
    fn test_pipe_into_cat_is_a_usage_error() {
        // cat takes a filename, not stdin
        let mut term = test_terminal();
        let results = term.process_line("echo hello | cat");
        assert_eq!(results[0], CommandResult::failure("usage: cat [file]".to_string()));
    }

    #[test]
    fn test_pipe_carries_output_forward() {
        let mut term = test_terminal();
        term.process_line("touch out");
        term.process_line("echo hello | echo ignored > out");
        // echo ignores piped input; the redirect stored the second echo
        let results = term.process_line("cat out");
        assert_eq!(results[0].output, vec!["ignored".to_string()]);
    }

    #[test]
    fn test_redirect_overwrites_then_appends() {
        let mut term = test_terminal();
        term.process_line("touch out");
        term.process_line("echo a > out");
        let results = term.process_line("echo b > out");
        ok_empty(&results[0]);
        assert_eq!(term.process_line("cat out")[0].output, vec!["b".to_string()]);

        term.process_line("echo c >> out");
        assert_eq!(term.process_line("cat out")[0].output, vec!["bc".to_string()]);
    }

    #[test]
    fn test_redirect_never_creates_the_target() {
        let mut term = test_terminal();
        let results = term.process_line("echo hi > missing");
        ok_empty(&results[0]);
        ok_empty(&term.process_line("ls")[0]);
    }

    #[test]
    fn test_redirect_into_subfolder() {
        let mut term = test_terminal();
        term.process_line("mkdir docs");
        term.process_line("cd docs; touch out; cd ..");
        term.process_line("echo deep > docs/out");
        term.process_line("cd docs");
        assert_eq!(term.process_line("cat out")[0].output, vec!["deep".to_string()]);
    }

    #[test]
    fn test_redirect_into_missing_folder_is_dropped() {
        let mut term = test_terminal();
        let results = term.process_line("echo hi > nowhere/out");
        ok_empty(&results[0]);
    }

    #[test]
    fn test_vi_is_not_implemented() {
        let mut term = test_terminal();
        let results = term.process_line("vi a.txt");
        assert_eq!(results[0], CommandResult::failure("vi not implemented".to_string()));
    }

    #[test]
    fn test_history_cycles_up_and_down() {
        let mut term = test_terminal();
        term.process_line("ls");
        term.process_line("pwd");

        assert_eq!(term.cycle_command(true), Some("pwd"));
        assert_eq!(term.cycle_command(true), Some("ls"));
        assert_eq!(term.cycle_command(false), Some("pwd"));
    }

    #[test]
    fn test_history_boundaries_yield_nothing() {
        let mut term = test_terminal();
        assert_eq!(term.cycle_command(true), None);
        assert_eq!(term.cycle_command(false), None);

        term.process_line("ls");
        assert_eq!(term.cycle_command(false), None);
        assert_eq!(term.cycle_command(true), Some("ls"));
        assert_eq!(term.cycle_command(true), None);
        assert_eq!(term.cycle_command(false), None);
    }

    #[test]
    fn test_history_recall_resets_on_submission() {
        let mut term = test_terminal();
        term.process_line("ls");
        assert_eq!(term.cycle_command(true), Some("ls"));
        term.process_line("pwd");
        assert_eq!(term.cycle_command(true), Some("pwd"));
    }
}
