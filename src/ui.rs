use crate::app::{App, Hit, ViewMode};
use crate::braille::BrailleCanvas;
use crate::map::basemap::BaseLayers;
use crate::map::geometry::{draw_line, draw_thick_line};
use crate::map::projection::Viewport;
use crate::overlay::{LinkPrimitive, NodePrimitive, ObjectKind, ObjectRef};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);

    if let Some((kind, at)) = app.chrome.context_menu {
        render_context_menu(frame, app, kind, at, chunks[0]);
    }
    if let Some(object) = app.chrome.detail {
        render_detail(frame, app, object, chunks[0]);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.mode {
        ViewMode::Overview(_) => " Network Sites ".to_string(),
        ViewMode::Drilldown(_) => format!(" {} ", app.mode_label()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Update viewport size for rendering (braille: 2x4 per character)
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let base = app
        .surface
        .render_base(inner.width as usize, inner.height as usize, &viewport);

    let overlays = build_overlays(app, &viewport, inner.width as usize, inner.height as usize);

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    let tooltip = hover_tooltip(app);

    frame.render_widget(
        MapWidget {
            base,
            overlays,
            cursor_pos,
            tooltip,
        },
        inner,
    );
}

/// A node glyph placed at a character cell
struct Marker {
    cell: (u16, u16),
    glyph: char,
    style: Style,
    label: Option<String>,
}

/// Overlay content for one frame
struct OverlayLayers {
    /// Link lines grouped by color, one canvas per color
    links: Vec<(Color, BrailleCanvas)>,
    /// Spider legs from an expanded cluster's center to its members
    spider: Option<BrailleCanvas>,
    markers: Vec<Marker>,
    /// Cluster badges: cell plus member count
    badges: Vec<((u16, u16), usize)>,
}

fn pixel_to_cell(px: i32, py: i32) -> Option<(u16, u16)> {
    (px >= 0 && py >= 0).then(|| ((px / 2) as u16, (py / 4) as u16))
}

fn build_overlays(app: &App, viewport: &Viewport, width: usize, height: usize) -> OverlayLayers {
    let mut layers = OverlayLayers {
        links: Vec::new(),
        spider: None,
        markers: Vec::new(),
        badges: Vec::new(),
    };

    let hovered = app
        .mouse_pixel_pos()
        .and_then(|(px, py)| app.hit_test(px, py))
        .and_then(|hit| match hit {
            Hit::Primitive(object) => Some(object),
            Hit::Cluster(_) => None,
        });

    let draw_node = |layers: &mut OverlayLayers, node: &NodePrimitive| {
        let (px, py) = viewport.project(node.position());
        if !viewport.is_visible(px, py) {
            return;
        }
        if let Some(cell) = pixel_to_cell(px, py) {
            let mut style = Style::default().fg(node.icon.color);
            if hovered == Some(node.object) {
                style = style.add_modifier(Modifier::BOLD);
            }
            layers.markers.push(Marker {
                cell,
                glyph: node.icon.glyph,
                style,
                label: (!node.label.is_empty()).then(|| node.label.clone()),
            });
        }
    };

    let draw_link = |layers: &mut OverlayLayers, link: &LinkPrimitive| {
        let a = viewport.project(link.endpoints.0);
        let b = viewport.project(link.endpoints.1);
        if !viewport.line_might_be_visible(a, b) {
            return;
        }
        let color = link.style.color;
        let idx = match layers.links.iter().position(|(c, _)| *c == color) {
            Some(idx) => idx,
            None => {
                layers.links.push((color, BrailleCanvas::new(width, height)));
                layers.links.len() - 1
            }
        };
        let canvas = &mut layers.links[idx].1;
        if hovered == Some(link.object) {
            draw_thick_line(canvas, a.0, a.1, b.0, b.1);
        } else {
            draw_line(canvas, a.0, a.1, b.0, b.1);
        }
    };

    if app.clustering_active() {
        let expanded_members: Vec<ObjectRef> = app
            .expanded
            .as_ref()
            .map(|c| c.members.clone())
            .unwrap_or_default();

        for cluster in app.cluster.clusters(app.viewport.zoom) {
            let is_expanded = app
                .expanded
                .as_ref()
                .map_or(false, |e| e.members == cluster.members);

            if cluster.is_singleton() || is_expanded {
                // Singletons and fanned members render as themselves
                for &member in &cluster.members {
                    match member.kind {
                        ObjectKind::Link => {
                            if let Some(link) = app.registry.link(member) {
                                draw_link(&mut layers, link);
                            }
                        }
                        _ => {
                            if let Some(node) = app.registry.node(member) {
                                draw_node(&mut layers, node);
                            }
                        }
                    }
                }
                if is_expanded {
                    // Legs from the cluster center to each fanned marker
                    let spider = layers
                        .spider
                        .get_or_insert_with(|| BrailleCanvas::new(width, height));
                    let center = viewport.project(cluster.center);
                    for &member in &expanded_members {
                        if let Some(node) = app.registry.node(member) {
                            let to = viewport.project(node.position());
                            draw_line(spider, center.0, center.1, to.0, to.1);
                        }
                    }
                }
            } else {
                let (px, py) = viewport.project(cluster.center);
                if viewport.is_visible(px, py) {
                    if let Some(cell) = pixel_to_cell(px, py) {
                        layers.badges.push((cell, cluster.members.len()));
                    }
                }
            }
        }
    } else {
        for &object in app.surface.attached_links() {
            if let Some(link) = app.registry.link(object) {
                draw_link(&mut layers, link);
            }
        }
        for &object in app.surface.attached_nodes() {
            if let Some(node) = app.registry.node(object) {
                draw_node(&mut layers, node);
            }
        }
    }

    layers
}

/// Tooltip text for whatever is under the cursor
fn hover_tooltip(app: &App) -> Option<String> {
    if app.chrome.context_menu.is_some() {
        return None;
    }
    let (px, py) = app.mouse_pixel_pos()?;
    match app.hit_test(px, py)? {
        Hit::Primitive(object) => {
            let label = match object.kind {
                ObjectKind::Link => app.registry.link(object).map(|l| l.label.clone()),
                _ => app.registry.node(object).map(|n| n.label.clone()),
            }?;
            Some(label)
        }
        Hit::Cluster(cluster) => Some(format!("{} objects", cluster.members.len())),
    }
}

/// Custom widget compositing braille layers with glyph overlays
struct MapWidget {
    base: BaseLayers,
    overlays: OverlayLayers,
    cursor_pos: Option<(u16, u16)>,
    tooltip: Option<String>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }

    fn put_text(text: &str, cell: (u16, u16), style: Style, area: Rect, buf: &mut Buffer) {
        if cell.1 >= area.height {
            return;
        }
        let y = area.y + cell.1;
        for (i, ch) in text.chars().enumerate() {
            let x = cell.0 as usize + i;
            if x >= area.width as usize {
                break;
            }
            buf[(area.x + x as u16, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: basemap, spider legs, links, markers, badges
        Self::render_layer(&self.base.coastlines, Color::DarkGray, area, buf);
        Self::render_layer(&self.base.borders, Color::DarkGray, area, buf);

        if let Some(spider) = &self.overlays.spider {
            Self::render_layer(spider, Color::DarkGray, area, buf);
        }

        for (color, canvas) in &self.overlays.links {
            Self::render_layer(canvas, *color, area, buf);
        }

        let label_style = Style::default().fg(Color::White);
        for marker in &self.overlays.markers {
            if marker.cell.0 >= area.width || marker.cell.1 >= area.height {
                continue;
            }
            let x = area.x + marker.cell.0;
            let y = area.y + marker.cell.1;
            buf[(x, y)].set_char(marker.glyph).set_style(marker.style);

            if let Some(label) = &marker.label {
                // Truncate to fit the remaining row
                let text: String = label.chars().take(24).collect();
                Self::put_text(&text, (marker.cell.0 + 2, marker.cell.1), label_style, area, buf);
            }
        }

        let badge_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        for (cell, count) in &self.overlays.badges {
            Self::put_text(&format!("({count})"), *cell, badge_style, area, buf);
        }

        if let Some(text) = &self.tooltip {
            if let Some((cx, cy)) = self.cursor_pos {
                let style = Style::default().fg(Color::Black).bg(Color::White);
                let cell = (cx.saturating_add(2), cy.saturating_sub(1));
                Self::put_text(text, cell, style, area, buf);
            }
        }

        // Cursor marker
        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)]
                    .set_char('╋')
                    .set_fg(Color::Red);
            }
        }
    }
}

fn render_context_menu(frame: &mut Frame, app: &App, kind: ObjectKind, at: (u16, u16), area: Rect) {
    let items = App::menu_items(kind);
    let width = (items.iter().map(|i| i.len()).max().unwrap_or(8) + 4) as u16;
    let height = items.len() as u16 + 2;

    let x = at.0.min(area.width.saturating_sub(width + 1)) + area.x;
    let y = at.1.min(area.height.saturating_sub(height + 1)) + area.y;
    let popup = Rect::new(x, y, width.min(area.width), height.min(area.height));

    let lines: Vec<Line> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == app.menu_cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(format!(" {item} "), style))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", kind.label()),
            Style::default().fg(Color::Cyan),
        ));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_detail(frame: &mut Frame, app: &App, object: ObjectRef, area: Rect) {
    let mut lines: Vec<Line> = vec![Line::from(vec![
        Span::styled("kind: ", Style::default().fg(Color::DarkGray)),
        Span::raw(object.kind.label()),
        Span::styled("  id: ", Style::default().fg(Color::DarkGray)),
        Span::raw(object.id.to_string()),
    ])];

    match object.kind {
        ObjectKind::Link => {
            if let Some(link) = app.registry.link(object) {
                lines.push(Line::from(vec![
                    Span::styled("name: ", Style::default().fg(Color::DarkGray)),
                    Span::raw(link.label.clone()),
                ]));
                let (a, b) = link.endpoints;
                lines.push(Line::from(format!(
                    "from: {:.3}, {:.3}",
                    a.lat, a.lon
                )));
                lines.push(Line::from(format!("to:   {:.3}, {:.3}", b.lat, b.lon)));
                lines.push(Line::from(format!(
                    "anchor: {:.3}, {:.3}",
                    link.anchor().lat,
                    link.anchor().lon
                )));
            }
        }
        _ => {
            if let Some(node) = app.registry.node(object) {
                lines.push(Line::from(vec![
                    Span::styled("name: ", Style::default().fg(Color::DarkGray)),
                    Span::raw(node.label.clone()),
                ]));
                let at = node.position();
                lines.push(Line::from(format!("at: {:.3}, {:.3}", at.lat, at.lon)));
            }
        }
    }
    lines.push(Line::from(Span::styled(
        "Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let width = 36u16.min(area.width.saturating_sub(2));
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Properties ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" View: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.mode_label(), Style::default().fg(Color::Cyan)),
        Span::styled(" | Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_label(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_label(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(
                "{} nodes, {} links",
                app.registry.node_count(),
                app.registry.link_count()
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(" | base: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.surface.style().label(),
            Style::default().fg(Color::Magenta),
        ),
    ];

    if let Some(status) = &app.status {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        ));
    }

    if app.chrome.geo_menu {
        spans.push(Span::styled(
            " | m:mode t:base r:refresh",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.chrome.insite_menu {
        spans.push(Span::styled(
            " | m:cluster",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.chrome.view_button {
        spans.push(Span::styled(
            " | Esc:sites",
            Style::default().fg(Color::Green),
        ));
    }
    spans.push(Span::styled(
        " | hjkl:pan +/-:zoom q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
