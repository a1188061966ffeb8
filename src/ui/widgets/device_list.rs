use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget},
};

use crate::devices::{Category, DeviceSettings};

/// Palette order of the categories
const CATEGORY_ORDER: [Category; 4] = [
    Category::Routers,
    Category::Switches,
    Category::EndDevices,
    Category::SecurityDevices,
];

/// Device indices in display order (grouped by category, then by name)
pub fn build_visual_order(devices: &[DeviceSettings]) -> Vec<usize> {
    let mut order = Vec::with_capacity(devices.len());
    for category in CATEGORY_ORDER {
        let mut group: Vec<usize> = (0..devices.len())
            .filter(|&i| devices[i].category == category)
            .collect();
        group.sort_by(|&a, &b| devices[a].name.cmp(&devices[b].name));
        order.extend(group);
    }
    order
}

/// Device list grouped by category
pub struct DeviceListWidget<'a> {
    pub devices: &'a [DeviceSettings],
    /// Index into `devices`
    pub selected: usize,
}

impl<'a> DeviceListWidget<'a> {
    pub fn new(devices: &'a [DeviceSettings], selected: usize) -> Self {
        Self { devices, selected }
    }

    pub fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" Devices ({}) ", self.devices.len());

        let mut items = Vec::new();
        let mut index_map: Vec<Option<usize>> = Vec::new();
        let order = build_visual_order(self.devices);

        for category in CATEGORY_ORDER {
            let group: Vec<usize> = order
                .iter()
                .copied()
                .filter(|&i| self.devices[i].category == category)
                .collect();
            if group.is_empty() {
                continue;
            }

            items.push(ListItem::new(Line::from(Span::styled(
                category.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))));
            index_map.push(None); // Headers are not selectable

            let count = group.len();
            for (pos, idx) in group.into_iter().enumerate() {
                let device = &self.devices[idx];
                let branch = if pos == count - 1 { "└─" } else { "├─" };
                items.push(ListItem::new(Line::from(vec![
                    Span::styled(format!("  {} ", branch), Style::default().fg(Color::DarkGray)),
                    Span::styled(device.name.clone(), Style::default().fg(Color::White)),
                    Span::styled(format!("  {}", device.server), Style::default().fg(Color::DarkGray)),
                ])));
                index_map.push(Some(idx));
            }
        }

        let selected_pos = index_map.iter().position(|&idx| idx == Some(self.selected));
        let mut state = ListState::default();
        state.select(selected_pos);

        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
                    .bg(Color::DarkGray),
            )
            .highlight_symbol("→ ");

        StatefulWidget::render(list, area, buf, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, category: Category) -> DeviceSettings {
        DeviceSettings {
            name: name.to_string(),
            path: String::new(),
            image: String::new(),
            initial_config: String::new(),
            ethernet_adapters: 0,
            serial_adapters: 0,
            default_symbol: String::new(),
            hover_symbol: String::new(),
            category,
            server: "local".to_string(),
        }
    }

    #[test]
    fn test_visual_order_groups_by_category() {
        let devices = vec![
            device("SW2", Category::Switches),
            device("R2", Category::Routers),
            device("SW1", Category::Switches),
            device("R1", Category::Routers),
        ];
        assert_eq!(build_visual_order(&devices), vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_visual_order_empty() {
        assert!(build_visual_order(&[]).is_empty());
    }
}
