use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use csvbrowse::paginator::PageItem;

use crate::model::{Model, UIData};

pub const HEADER_BAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const PAGER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const POPUP_WIDTH: u16 = 60;

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [header_area, table_area, pager_area, cmd_area] = Layout::vertical([
            Constraint::Length(HEADER_BAR_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(PAGER_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.draw_header(uidata, frame, header_area);
        if uidata.loaded {
            self.draw_table(uidata, frame, table_area);
            self.draw_pager(uidata, frame, pager_area);
        } else {
            let text = if uidata.loading {
                "Loading ..."
            } else {
                "No file loaded. Press o to open a CSV file."
            };
            frame.render_widget(
                Paragraph::new(text).centered().dark_gray(),
                Rect {
                    y: table_area.y + table_area.height / 2,
                    height: 1,
                    ..table_area
                },
            );
        }
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_header(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let stats = &uidata.statistics;
        let mut spans = vec![
            Span::from(" csvbrowse ").bold().reversed(),
            Span::from(" "),
        ];
        if uidata.loaded {
            spans.push(Span::from(uidata.name.clone()).yellow());
            spans.push(Span::from(format!(
                "  {} of {} rows  {} columns",
                stats.displayed_rows, stats.total_rows, stats.columns
            )));
            if uidata.hidden_columns > 0 {
                spans.push(Span::from(format!(" ({} hidden)", uidata.hidden_columns)).dark_gray());
            }
            if !uidata.search_term.is_empty() {
                spans.push(Span::from("  search: ").dark_gray());
                spans.push(Span::from(uidata.search_term.clone()).cyan());
            }
            if !uidata.filters.is_empty() {
                let filters = uidata
                    .filters
                    .iter()
                    .map(|(field, value)| format!("{field}={value}"))
                    .collect::<Vec<String>>()
                    .join(", ");
                spans.push(Span::from("  filters: ").dark_gray());
                spans.push(Span::from(filters).cyan());
            }
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        let mut header = vec![Cell::from(uidata.index.name.clone()).dark_gray()];
        header.extend(uidata.table.iter().map(|column| {
            let cell = Cell::from(column.name.clone());
            if column.filtered {
                cell.cyan()
            } else {
                cell
            }
        }));

        let rows: Vec<Row> = (0..uidata.nrows)
            .map(|ridx| {
                let mut cells = vec![
                    Cell::from(uidata.index.data.get(ridx).cloned().unwrap_or_default())
                        .dark_gray(),
                ];
                cells.extend(uidata.table.iter().enumerate().map(|(cidx, column)| {
                    let value = column.data.get(ridx).cloned().unwrap_or_default();
                    let cell = Cell::from(value);
                    if ridx == uidata.selected_row && cidx == uidata.selected_column {
                        cell.style(Style::new().bg(Color::Blue).fg(Color::White))
                    } else if ridx == uidata.selected_row {
                        cell.style(Style::new().bg(Color::DarkGray))
                    } else {
                        cell
                    }
                }));
                Row::new(cells)
            })
            .collect();

        let mut widths = vec![Constraint::Length(uidata.layout.index_width as u16)];
        widths.extend(
            uidata
                .table
                .iter()
                .map(|column| Constraint::Length(column.width as u16)),
        );

        frame.render_widget(
            Table::new(rows, widths)
                .column_spacing(1)
                .header(Row::new(header).style(header_style)),
            area,
        );

        if uidata.statistics.displayed_rows == 0 {
            frame.render_widget(
                Paragraph::new("No matching rows").centered().dark_gray(),
                Rect {
                    y: area.y + area.height / 2,
                    height: 1,
                    ..area
                },
            );
        }
    }

    fn draw_pager(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let paging = &uidata.paging;
        let mut spans = Vec::new();
        if uidata.statistics.displayed_rows > 0 {
            spans.push(Span::from(format!(
                " Rows {}-{} of {} ",
                paging.start + 1,
                paging.end,
                uidata.statistics.displayed_rows
            )));
        } else {
            spans.push(Span::from(" Rows 0 of 0 "));
        }

        let previous = if paging.current_page > 1 { "‹ " } else { "  " };
        spans.push(Span::from(previous).bold());
        for item in &paging.items {
            match item {
                PageItem::Page(page) if *page == paging.current_page => {
                    spans.push(Span::from(format!("[{page}]")).bold().reversed());
                }
                PageItem::Page(page) => spans.push(Span::from(page.to_string())),
                PageItem::Ellipsis => spans.push(Span::from("…").dark_gray()),
            }
            spans.push(Span::from(" "));
        }
        let next = if paging.current_page < paging.total_pages {
            "›"
        } else {
            " "
        };
        spans.push(Span::from(next).bold());
        spans.push(Span::from(format!("  {} per page", paging.page_size)).dark_gray());

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or(":");
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
        } else {
            frame.render_widget(
                Paragraph::new(uidata.status_message.clone()).dark_gray(),
                area,
            );
        }
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let height = (message.lines().count() + 2) as u16;
        let [area] = Layout::horizontal([Constraint::Length(POPUP_WIDTH)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);

        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .wrap(Wrap { trim: false })
                .block(
                    Block::bordered()
                        .title(Line::from(" Help ").bold().centered())
                        .title_bottom(Line::from(" <Esc> close ").centered()),
                ),
            area,
        );
    }
}
