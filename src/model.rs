use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use csvbrowse::codec;
use csvbrowse::domain::{BrowseConfig, BrowseError, CMDMode, HELP_TEXT, Message, PAGE_SIZE_CHOICES};
use csvbrowse::paginator::PageItem;
use csvbrowse::{Browser, LoadEvent, Shift, SortDirection, SortSpec, Statistics};

use crate::inputter::{InputResult, Inputter};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, HEADER_BAR_HEIGHT, PAGER_HEIGHT, TABLE_HEADER_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub filtered: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub items: Vec<PageItem>,
    pub start: usize,
    pub end: usize,
    pub page_size: usize,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub nrows: usize, // Rows of the current page that are rendered
    pub selected_row: usize,
    pub selected_column: usize,
    pub statistics: Statistics,
    pub search_term: String,
    pub filters: Vec<(String, String)>,
    pub hidden_columns: usize,
    pub paging: PageInfo,
    pub loaded: bool,
    pub loading: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::default(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            statistics: Statistics {
                total_rows: 0,
                displayed_rows: 0,
                columns: 0,
            },
            search_term: String::new(),
            filters: Vec::new(),
            hidden_columns: 0,
            paging: PageInfo::default(),
            loaded: false,
            loading: false,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        // Index column plus its spacer
        let index_total = if index_width > 0 { index_width + 1 } else { 0 };
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(index_total),
            table_height: ui_height
                .saturating_sub(HEADER_BAR_HEIGHT + TABLE_HEADER_HEIGHT + PAGER_HEIGHT + CMDLINE_HEIGH)
                .max(1),
            index_width,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: BrowseConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    browser: Browser,
    curser_row: usize,    // Row within the current page
    curser_column: usize, // Position within the visible columns
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &BrowseConfig, ui_width: usize, ui_height: usize) -> Result<Self, BrowseError> {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard not available: {e}");
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            browser: Browser::new(config),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started csvbrowse! Press o to open a file, ? for help.".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.update_table_data();
        Ok(model)
    }

    /// Starts loading `path`, `~` and environment variables are expanded.
    pub fn open(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        match shellexpand::full(path) {
            Ok(expanded) => {
                let path = PathBuf::from(expanded.as_ref());
                self.browser.open(&path);
                self.status = Status::LOADING;
                self.set_status_message(format!("Loading {} ...", path.display()));
            }
            Err(e) => {
                let err = BrowseError::InvalidPath(e.to_string());
                self.set_status_message(err.to_string());
            }
        }
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), BrowseError> {
        if let Some(event) = self.browser.poll() {
            self.handle_load_event(event);
        }
        if self.status == Status::LOADING && !self.browser.is_loading() {
            self.status = Status::READY;
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit => {}
                    Message::MoveUp => self.move_selection_up(),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveLeft => self.move_selection_left(),
                    Message::MoveRight => self.move_selection_right(),
                    Message::NextPage => self.change_page(|s| s.next_page()),
                    Message::PrevPage => self.change_page(|s| s.prev_page()),
                    Message::FirstPage => self.change_page(|s| s.first_page()),
                    Message::LastPage => self.change_page(|s| s.last_page()),
                    Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                    Message::RemoveFilter => self.remove_current_filter(),
                    Message::ClearFilters => self.clear_filters(),
                    Message::Sort => self.sort_current_column(),
                    Message::ClearSort => self.clear_sort(),
                    Message::HideColumn => self.hide_current_column(),
                    Message::ShowAllColumns => self.show_all_columns(),
                    Message::MoveColumnLeft => self.move_current_column(Shift::Left),
                    Message::MoveColumnRight => self.move_current_column(Shift::Right),
                    Message::CyclePageSize => self.cycle_page_size(),
                    Message::Open => self.enter_cmd_mode(CMDMode::Open),
                    Message::RemoveFile => self.remove_file(),
                    Message::Export => self.export(),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::EnterCommand => self.enter_cmd_mode(CMDMode::Raw),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::RawKey(_) => {}
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.update_table_data();
        Ok(())
    }

    fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Loaded {
                name,
                rows,
                columns,
            } => {
                self.reset_cursor();
                self.offset_column = 0;
                self.curser_column = 0;
                self.set_status_message(format!(
                    "Loaded {rows} rows and {columns} columns from {name}"
                ));
            }
            LoadEvent::Failed(e) => self.set_status_message(e.to_string()),
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(self.uilayout.index_width, width, height);
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if let Modus::POPUP = self.modus {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
            self.uidata.last_update = Instant::now();
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
            self.uidata.cmd_mode = self.cmd_mode;
            self.uidata.last_update = Instant::now();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        let prefill = match mode {
            CMDMode::Search => self.browser.session().config().search_term().to_string(),
            CMDMode::Filter => match self.current_field() {
                Some(field) => self
                    .browser
                    .session()
                    .config()
                    .filter_value(&field)
                    .unwrap_or("")
                    .to_string(),
                None => {
                    self.set_status_message("No column to filter");
                    return;
                }
            },
            _ => String::new(),
        };

        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        self.input.set(&prefill);
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.last_update = Instant::now();
        self.uidata.cmd_mode = self.cmd_mode;
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.uidata.active_cmdinput = self.active_cmdinput;

        let cmd_mode = self.cmd_mode.take();
        if self.last_input.canceled {
            return;
        }
        let cmd_input = self.last_input.input.clone();
        match cmd_mode {
            Some(CMDMode::Search) => self.search(&cmd_input),
            Some(CMDMode::Filter) => self.filter_current_column(&cmd_input),
            Some(CMDMode::Open) => self.open(&cmd_input),
            Some(CMDMode::GotoPage) => self.goto_page(&cmd_input),
            Some(CMDMode::Raw) => self.run_command(&cmd_input),
            None => info!("Cmd mode is none!"),
        }
    }

    /// Commands entered after `:`.
    fn run_command(&mut self, line: &str) {
        let line = line.trim();
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };
        debug!("Command {cmd:?} with argument {arg:?}");
        match cmd {
            "" => {}
            "show" | "hide" => self.set_column_visibility(arg, cmd == "show"),
            "showall" => self.show_all_columns(),
            "hideall" => {
                self.browser.session_mut().toggle_all_columns(false);
                self.curser_column = 0;
                self.offset_column = 0;
            }
            "order" => {
                let order: Vec<String> = arg
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if self.browser.session_mut().reorder_columns(order) {
                    self.curser_column = 0;
                    self.offset_column = 0;
                }
            }
            "pagesize" => match arg.parse::<usize>() {
                Ok(size) if size > 0 => {
                    self.browser.session_mut().set_page_size(size);
                    self.reset_cursor();
                }
                _ => self.set_status_message(format!("Invalid page size \"{arg}\"")),
            },
            "page" => self.goto_page(arg),
            "sort" => {
                let (field, direction) = match arg.rsplit_once(char::is_whitespace) {
                    Some((field, "desc")) => (field.trim(), SortDirection::Descending),
                    Some((field, "asc")) => (field.trim(), SortDirection::Ascending),
                    _ => (arg, SortDirection::Ascending),
                };
                if self.browser.session().dataset().has_field(field) {
                    self.browser
                        .session_mut()
                        .set_sort(SortSpec::new(field, direction));
                    self.reset_cursor();
                } else {
                    self.set_status_message(format!("Unknown column \"{field}\""));
                }
            }
            "unsort" => self.clear_sort(),
            "search" => self.search(arg),
            "filter" => match arg.split_once(char::is_whitespace) {
                Some((field, value)) => self.filter_column(field, value.trim()),
                None => self.filter_column(arg, ""),
            },
            "clear" => self.clear_filters(),
            "open" => self.open(arg),
            "export" => self.export(),
            "remove" => self.remove_file(),
            "help" => self.show_help(),
            "q" | "quit" => self.quit(),
            _ => self.set_status_message(format!("Unknown command \"{cmd}\"")),
        }
    }

    fn current_field(&self) -> Option<String> {
        self.browser
            .session()
            .config()
            .visible_columns()
            .get(self.curser_column)
            .cloned()
    }

    fn reset_cursor(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn change_page(&mut self, f: impl FnOnce(&mut csvbrowse::Session)) {
        let before = self.browser.session().config().current_page();
        f(self.browser.session_mut());
        if self.browser.session().config().current_page() != before {
            self.reset_cursor();
        }
    }

    fn goto_page(&mut self, input: &str) {
        match input.trim().parse::<usize>() {
            Ok(page) => self.change_page(|s| s.set_page(page)),
            Err(_) => self.set_status_message(format!("Invalid page \"{}\"", input.trim())),
        }
    }

    fn search(&mut self, term: &str) {
        let start_time = Instant::now();
        self.browser.session_mut().set_search_term(term);
        self.reset_cursor();
        let stats = self.browser.session().statistics();
        trace!(
            "Search for {:?} took {}ms",
            term,
            start_time.elapsed().as_millis()
        );
        if term.trim().is_empty() {
            self.set_status_message("Search cleared");
        } else if stats.displayed_rows == 0 {
            self.set_status_message("Found no matches!");
        } else {
            self.set_status_message(format!("Found {} matching rows", stats.displayed_rows));
        }
    }

    fn filter_current_column(&mut self, value: &str) {
        if let Some(field) = self.current_field() {
            self.filter_column(&field, value);
        }
    }

    fn filter_column(&mut self, field: &str, value: &str) {
        if !self.browser.session().dataset().has_field(field) {
            self.set_status_message(format!("Unknown column \"{field}\""));
            return;
        }
        if value.trim().is_empty() {
            self.browser.session_mut().remove_filter(field);
        } else {
            self.browser.session_mut().set_column_filter(field, value);
        }
        self.reset_cursor();
        let stats = self.browser.session().statistics();
        self.set_status_message(format!(
            "{} of {} rows match",
            stats.displayed_rows, stats.total_rows
        ));
    }

    fn remove_current_filter(&mut self) {
        if let Some(field) = self.current_field() {
            self.browser.session_mut().remove_filter(&field);
            self.reset_cursor();
        }
    }

    fn clear_filters(&mut self) {
        self.browser.session_mut().clear_all_filters();
        self.reset_cursor();
        self.set_status_message("Cleared search and filters");
    }

    fn sort_current_column(&mut self) {
        if let Some(field) = self.current_field() {
            self.browser.session_mut().sort_by(&field);
            self.reset_cursor();
        }
    }

    fn clear_sort(&mut self) {
        self.browser.session_mut().clear_sort();
        self.reset_cursor();
    }

    fn hide_current_column(&mut self) {
        if let Some(field) = self.current_field() {
            self.browser.session_mut().toggle_column(&field);
            self.set_status_message(format!("Hid column \"{field}\""));
        }
    }

    fn set_column_visibility(&mut self, field: &str, visible: bool) {
        let session = self.browser.session();
        if !session.dataset().has_field(field) {
            self.set_status_message(format!("Unknown column \"{field}\""));
            return;
        }
        if session.config().is_visible(field) != visible {
            self.browser.session_mut().toggle_column(field);
        }
    }

    fn show_all_columns(&mut self) {
        self.browser.session_mut().toggle_all_columns(true);
    }

    fn move_current_column(&mut self, shift: Shift) {
        if let Some(field) = self.current_field()
            && self.browser.session_mut().move_column(&field, shift)
        {
            self.curser_column = match shift {
                Shift::Left => self.curser_column.saturating_sub(1),
                Shift::Right => self.curser_column + 1,
            };
        }
    }

    fn cycle_page_size(&mut self) {
        let current = self.browser.session().config().page_size();
        let next = PAGE_SIZE_CHOICES
            .iter()
            .copied()
            .find(|&size| size > current)
            .unwrap_or(PAGE_SIZE_CHOICES[0]);
        self.browser.session_mut().set_page_size(next);
        self.reset_cursor();
        self.set_status_message(format!("{next} rows per page"));
    }

    fn remove_file(&mut self) {
        self.browser.remove_file();
        self.status = Status::READY;
        self.reset_cursor();
        self.curser_column = 0;
        self.offset_column = 0;
        self.set_status_message("File removed");
    }

    fn export(&mut self) {
        let rows = self.browser.session().statistics().displayed_rows;
        match self.browser.export() {
            Ok(Some(path)) => {
                self.set_status_message(format!("Exported {rows} rows to {}", path.display()))
            }
            Ok(None) => self.set_status_message("No rows to export"),
            Err(e) => self.set_status_message(format!("Export failed: {e}")),
        }
    }

    fn selected_row(&self) -> Option<usize> {
        self.browser.session().page().rows.get(self.curser_row).copied()
    }

    fn copy_to_clipboard(&mut self, content: String) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => trace!("Copied content to clipboard."),
                Err(e) => trace!("Error copying to clipboard: {:?}", e),
            },
            None => self.set_status_message("Clipboard is not available"),
        }
    }

    fn copy_table_cell(&mut self) {
        let (Some(row), Some(field)) = (self.selected_row(), self.current_field()) else {
            return;
        };
        let cell = self.browser.session().dataset().value(row, &field).to_string();
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_table_row(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let record = {
            let session = self.browser.session();
            let cells: Vec<&str> = session
                .config()
                .visible_columns()
                .iter()
                .map(|field| session.dataset().value(row, field))
                .collect();
            codec::serialize_record(&cells[..])
        };
        match record {
            Ok(content) => self.copy_to_clipboard(content),
            Err(e) => self.set_status_message(format!("Could not copy row: {e}")),
        }
    }

    fn move_selection_up(&mut self) {
        self.curser_row = self.curser_row.saturating_sub(1);
    }

    fn move_selection_down(&mut self) {
        let nrows = self.browser.session().page().rows.len();
        if self.curser_row + 1 < nrows {
            self.curser_row += 1;
        }
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        let ncolumns = self.browser.session().config().visible_columns().len();
        if self.curser_column + 1 < ncolumns {
            self.curser_column += 1;
        }
    }

    // ------------------------- Building the ui data ------------------------- //

    fn calculate_column_width(name: &str, data: &[String], max_column_width: usize) -> usize {
        let max_width = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let width = std::cmp::max(name.chars().count(), max_width) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, max_column_width.max(3))
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    // Columns starting at `offset` that fit into `table_width`, the last one possibly cut.
    fn fit_columns(widths: &[usize], offset: usize, table_width: usize) -> Vec<(usize, usize, bool)> {
        let mut fitted = Vec::new();
        let mut visible_width = 0;
        for (cidx, &width) in widths.iter().enumerate().skip(offset) {
            if visible_width + width + 1 <= table_width {
                fitted.push((cidx, width, true));
                visible_width += width + 1;
            } else {
                if visible_width < table_width {
                    fitted.push((cidx, table_width - visible_width, false));
                }
                break;
            }
        }
        fitted
    }

    fn update_table_data(&mut self) {
        let session = self.browser.session();
        let config = session.config();
        let dataset = session.dataset();
        let page = session.page();
        let visible = config.visible_columns();

        let nrows = page.rows.len();
        self.curser_row = std::cmp::min(self.curser_row, nrows.saturating_sub(1));
        let height = self.uilayout.table_height.max(1);
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }
        let rbegin = std::cmp::min(self.offset_row, nrows);
        let rend = std::cmp::min(rbegin + height, nrows);
        let rows = &page.rows[rbegin..rend];

        // Row numbers of the source file
        let index_data: Vec<String> = rows.iter().map(|idx| (idx + 1).to_string()).collect();
        let index_width = index_data.iter().map(|s| s.len()).max().unwrap_or(0);
        self.uilayout = UILayout::from_values(index_width, self.uilayout.width, self.uilayout.height);

        let columns: Vec<(String, Vec<String>)> = visible
            .iter()
            .map(|field| {
                let mut name = field.clone();
                if config.sort().field() == Some(field.as_str()) {
                    name.push_str(match config.sort().direction() {
                        SortDirection::Ascending => " ▲",
                        SortDirection::Descending => " ▼",
                    });
                }
                let data = rows
                    .iter()
                    .map(|&ridx| dataset.value(ridx, field).replace("\r\n", " ↵ ").replace('\n', " ↵ "))
                    .collect();
                (name, data)
            })
            .collect();
        let widths: Vec<usize> = columns
            .iter()
            .map(|(name, data)| Self::calculate_column_width(name, data, self.config.max_column_width))
            .collect();

        self.curser_column = std::cmp::min(self.curser_column, visible.len().saturating_sub(1));
        self.offset_column = std::cmp::min(self.offset_column, self.curser_column);
        let mut fitted = Self::fit_columns(&widths, self.offset_column, self.uilayout.table_width);
        // Shift the view until the selected column is completely visible
        while self.offset_column < self.curser_column
            && !fitted
                .iter()
                .any(|&(cidx, _, complete)| cidx == self.curser_column && complete)
        {
            self.offset_column += 1;
            fitted = Self::fit_columns(&widths, self.offset_column, self.uilayout.table_width);
        }

        let table: Vec<ColumnView> = fitted
            .iter()
            .map(|&(cidx, width, _)| {
                let (name, data) = &columns[cidx];
                ColumnView {
                    name: Self::get_visible_name(name, width),
                    width,
                    data: data.clone(),
                    filtered: config
                        .filter_value(&visible[cidx])
                        .is_some_and(|v| !v.trim().is_empty()),
                }
            })
            .collect();

        let current_page = config.current_page();
        let paging = PageInfo {
            current_page,
            total_pages: page.total_pages,
            items: session.page_numbers(),
            start: page.start,
            end: page.end,
            page_size: config.page_size(),
        };

        let name = self
            .browser
            .current_file()
            .map(|r| r.original_filename.clone())
            .unwrap_or_default();

        self.uidata = UIData {
            name,
            table,
            index: ColumnView {
                name: "#".to_string(),
                width: index_width,
                data: index_data,
                filtered: false,
            },
            nrows: rend - rbegin,
            selected_row: self.curser_row - rbegin.min(self.curser_row),
            selected_column: self.curser_column - self.offset_column,
            statistics: session.statistics(),
            search_term: config.search_term().trim().to_string(),
            filters: config
                .active_filters()
                .map(|(f, v)| (f.to_string(), v.to_string()))
                .collect(),
            hidden_columns: dataset.fields().len().saturating_sub(visible.len()),
            paging,
            loaded: session.is_loaded(),
            loading: self.browser.is_loading(),
            show_popup: self.uidata.show_popup,
            popup_message: std::mem::take(&mut self.uidata.popup_message),
            layout: self.uilayout.clone(),
            last_update: Instant::now(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_width_is_capped() {
        let wide = vec!["x".repeat(100)];
        assert_eq!(Model::calculate_column_width("name", &wide, 40), 40);
        let narrow = vec!["ab".to_string()];
        assert_eq!(Model::calculate_column_width("name", &narrow, 40), 4 + COLUMN_WIDTH_MARGIN);
    }

    #[test]
    fn visible_names_are_shortened() {
        assert_eq!(Model::get_visible_name("description", 8), "descr...");
        assert_eq!(Model::get_visible_name("id", 8), "id");
        assert_eq!(Model::get_visible_name("id", 2), "");
    }

    #[test]
    fn columns_fit_the_table_width() {
        let fitted = Model::fit_columns(&[5, 5, 5], 0, 14);
        assert_eq!(fitted, vec![(0, 5, true), (1, 5, true), (2, 2, false)]);
        let fitted = Model::fit_columns(&[5, 5, 5], 1, 14);
        assert_eq!(fitted, vec![(1, 5, true), (2, 5, true)]);
    }
}
