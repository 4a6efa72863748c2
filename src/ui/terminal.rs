//! Terminal surface
//!
//! Paints the retained view tree with ratatui. The painter only reads the
//! tree (classes, attributes, text); it never looks at application state, so
//! whatever the reconciler produced is exactly what ends up on screen.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::ui::node::{Element, Node};
use crate::ui::Theme;

/// Paint the whole tree into the frame
pub fn paint(frame: &mut Frame, dom: &Node) {
    let area = frame.area();
    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Theme::base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    paint_header(frame, chunks[0], dom);
    if let Some(list) = dom.find_class("torrent-list") {
        paint_torrent_list(frame, chunks[1], list);
    } else if let Some(player) = dom.find_class("player") {
        paint_player(frame, chunks[1], player);
    }
    paint_status_bar(frame, chunks[2], dom);

    if let Some(messages) = dom.find_class("messages") {
        paint_messages(frame, area, messages);
    }
}

fn text_of(el: Option<&Element>) -> String {
    el.map(|e| e.children.iter().map(Node::text_content).collect())
        .unwrap_or_default()
}

fn child_elements(el: &Element) -> impl Iterator<Item = &Element> {
    el.children.iter().filter_map(Node::as_element)
}

fn paint_header(frame: &mut Frame, area: Rect, dom: &Node) {
    let title = text_of(dom.find_class("title"));
    let mut spans = vec![Span::styled(title, Theme::heading())];
    if let Some(badge) = dom.find_class("badge") {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!(" {} done ", text_of(Some(badge))), Theme::badge()));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Theme::frame()),
        );
    frame.render_widget(header, area);
}

// =============================================================================
// Torrent List
// =============================================================================

fn paint_torrent_list(frame: &mut Frame, area: Rect, list: &Element) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::frame_active())
        .title(Span::styled(" TORRENTS ", Theme::heading()));

    let rows: Vec<&Element> = child_elements(list).filter(|e| e.has_class("torrent")).collect();
    if rows.is_empty() {
        let hint = Paragraph::new(text_of(list.children.iter().find_map(Node::as_element)))
            .style(Theme::muted())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let mut state = ListState::default();
    state.select(rows.iter().position(|r| r.has_class("selected")));

    let items: Vec<ListItem> = rows.iter().map(|row| torrent_item(row)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_symbol("▸ ")
        .style(Theme::base());
    frame.render_stateful_widget(list, area, &mut state);
}

fn torrent_item(row: &Element) -> ListItem<'static> {
    let selected = row.has_class("selected");
    let node = Node::Element(row.clone());
    let field = |class: &str| text_of(node.find_class(class));

    let ready = node
        .find_class("play")
        .map(|p| !p.has_class("disabled"))
        .unwrap_or(false);

    let name_style = if selected { Theme::selected_row() } else { Theme::base() };
    let mut name = vec![Span::styled(field("name"), name_style)];
    if !ready {
        name.push(Span::styled("  (not ready)", Theme::muted()));
    }

    let status = node
        .find_class("status")
        .map(|s| {
            child_elements(s)
                .map(|span| text_of(Some(span)))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .unwrap_or_default();

    let mut details = vec![
        Span::raw("  "),
        Span::styled(status, Theme::progress()),
        Span::raw("  "),
    ];
    if node.find_class("files").is_some() {
        details.push(Span::styled(format!("{}  ", field("files")), Theme::file_count()));
    }
    details.extend([
        Span::styled(format!("{}  ", field("peers")), Theme::muted()),
        Span::styled(format!("{}  ", field("download-speed")), Theme::download()),
        Span::styled(field("upload-speed"), Theme::upload()),
    ]);

    ListItem::new(vec![Line::from(name), Line::from(details)])
}

// =============================================================================
// Player
// =============================================================================

fn paint_player(frame: &mut Frame, area: Rect, player: &Element) {
    let node = Node::Element(player.clone());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::frame_active())
        .title(Span::styled(" ▶ NOW PLAYING ", Theme::progress()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let bar_width = inner.width.saturating_sub(4) as usize;
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(text_of(node.find_class("name")), Theme::heading())),
        Line::from(Span::styled(text_of(node.find_class("casting")), Theme::casting())),
    ];
    if let Some(url) = node.find_class("url") {
        lines.push(Line::from(Span::styled(text_of(Some(url)), Theme::muted())));
    }
    lines.push(Line::from(""));
    if let Some(bar) = node.find_class("loading-bar") {
        lines.push(Line::from(loading_bar_spans(bar, bar_width)));
    }
    lines.push(Line::from(Span::styled(
        text_of(node.find_class("position")),
        Theme::muted(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(control_hints(&node)));

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

/// Cells of the loading bar: filled where any loaded run overlaps the cell
pub fn loading_bar_cells(bar: &Element, width: usize) -> Vec<bool> {
    let pieces: usize = bar
        .get_attr("data-pieces")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let mut cells = vec![false; width];
    if pieces == 0 || width == 0 {
        return cells;
    }
    for part in child_elements(bar) {
        let attr = |name: &str| part.get_attr(name).and_then(|v| v.parse::<usize>().ok());
        let (Some(start), Some(count)) = (attr("data-start"), attr("data-count")) else {
            continue;
        };
        let first = start * width / pieces;
        let last = ((start + count) * width).div_ceil(pieces).min(width);
        for cell in cells.iter_mut().take(last).skip(first) {
            *cell = true;
        }
    }
    cells
}

fn loading_bar_spans(bar: &Element, width: usize) -> Vec<Span<'static>> {
    let cells = loading_bar_cells(bar, width);
    let filled: String = cells.iter().map(|&c| if c { '█' } else { '░' }).collect();
    vec![Span::styled(filled, Theme::loaded_pieces())]
}

fn control_hints(player: &Node) -> Vec<Span<'static>> {
    let paused = text_of(player.find_class("play-pause")) == "play_arrow";
    let mut hints = vec![
        (" SPACE ", if paused { "Play  " } else { "Pause  " }),
        (" ←→ ", "Seek  "),
        (" f ", "Fullscreen  "),
    ];
    if player.find_class("chromecast").is_some() {
        hints.push((" c ", "Chromecast  "));
    }
    if player.find_class("airplay").is_some() {
        hints.push((" a ", "AirPlay  "));
    }
    hints.push((" ESC ", "Back"));

    hints
        .into_iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(key, Theme::key_hint()),
                Span::styled(desc, Theme::key_hint_desc()),
            ]
        })
        .collect()
}

// =============================================================================
// Status Bar and Messages
// =============================================================================

fn paint_status_bar(frame: &mut Frame, area: Rect, dom: &Node) {
    let help = if dom.find_class("player").is_some() {
        " q:quit  ESC:back  f:fullscreen "
    } else {
        " q:quit  ↑↓:select  enter:play  c:cast  a:airplay  d:delete  v:paste "
    };
    let line = Line::from(vec![
        Span::styled(" SEEDCAST ", Theme::badge()),
        Span::styled(help, Theme::muted()),
    ]);
    frame.render_widget(Paragraph::new(line).style(Theme::status_bar()), area);
}

fn paint_messages(frame: &mut Frame, area: Rect, messages: &Element) {
    let node = Node::Element(messages.clone());
    let (title, style, text) = match node.find_class("error") {
        Some(error) => (" ERROR ", Theme::error(), text_of(Some(error))),
        None => (" WARNING ", Theme::warning(), text_of(node.find_class("warning"))),
    };

    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    };

    let body = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(style)
                .title(Span::styled(title, style)),
        );
    frame.render_widget(Clear, popup);
    frame.render_widget(body, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::node::div;

    fn bar(pieces: usize, parts: &[(usize, usize)]) -> Element {
        div("loading-bar")
            .attr("data-pieces", pieces.to_string())
            .children(parts.iter().map(|(start, count)| {
                div("loading-bar-part")
                    .attr("data-start", start.to_string())
                    .attr("data-count", count.to_string())
            }))
    }

    #[test]
    fn test_loading_bar_cells_scale_to_width() {
        let cells = loading_bar_cells(&bar(8, &[(0, 2), (6, 2)]), 4);
        assert_eq!(cells, vec![true, false, false, true]);
    }

    #[test]
    fn test_loading_bar_cells_round_partial_cells_up() {
        // One piece out of 100 is still visible on a 10-cell bar
        let cells = loading_bar_cells(&bar(100, &[(55, 1)]), 10);
        assert_eq!(cells.iter().filter(|c| **c).count(), 1);
        assert!(cells[5]);
    }

    #[test]
    fn test_loading_bar_cells_empty() {
        assert_eq!(loading_bar_cells(&bar(0, &[]), 3), vec![false; 3]);
    }
}
