use super::{ParseError, Tokens, read_file};
use crate::db::core::{DesignDB, LayerDirection};

pub fn parse(db: &mut DesignDB, filename: &str) -> Result<(), ParseError> {
    let content = read_file(filename)?;
    parse_str(db, &content)
}

/// Reads the layered capacity description: grid size, cost metrics, edge
/// lengths and one row-major capacity matrix per layer.
pub fn parse_str(db: &mut DesignDB, content: &str) -> Result<(), ParseError> {
    let mut tokens = Tokens::new(content);

    let n_layers: usize = tokens.next_value("layer count")?;
    let x_size: usize = tokens.next_value("grid x size")?;
    let y_size: usize = tokens.next_value("grid y size")?;
    if n_layers == 0 || x_size == 0 || y_size == 0 {
        return Err(ParseError::InvalidToken {
            field: "grid dimension".to_string(),
            token: format!("{} {} {}", n_layers, x_size, y_size),
        });
    }

    let unit_length_wire_cost: f64 = tokens.next_value("unit length wire cost")?;
    let unit_via_cost: f64 = tokens.next_value("unit via cost")?;

    let mut weights = Vec::with_capacity(n_layers);
    for i in 0..n_layers {
        weights.push(tokens.next_value(&format!("overflow weight of layer {}", i))?);
    }

    let mut h_edges = Vec::with_capacity(x_size - 1);
    for i in 0..x_size - 1 {
        h_edges.push(tokens.next_value(&format!("horizontal edge length {}", i))?);
    }
    let mut v_edges = Vec::with_capacity(y_size - 1);
    for i in 0..y_size - 1 {
        v_edges.push(tokens.next_value(&format!("vertical edge length {}", i))?);
    }

    db.set_dimension(n_layers, x_size, y_size, h_edges, v_edges);
    db.set_metrics(unit_length_wire_cost, unit_via_cost, weights);

    for layer in 0..n_layers {
        let name = tokens.next_str(&format!("name of layer {}", layer))?.to_string();
        let dir_field = format!("direction of layer '{}'", name);
        let dir_token: usize = tokens.next_value(&dir_field)?;
        let direction =
            LayerDirection::from_index(dir_token).ok_or_else(|| ParseError::InvalidToken {
                field: dir_field.clone(),
                token: dir_token.to_string(),
            })?;
        let min_length: f64 = tokens.next_value(&format!("min length of layer '{}'", name))?;

        let mut capacity = Vec::with_capacity(x_size * y_size);
        for y in 0..y_size {
            for x in 0..x_size {
                capacity.push(
                    tokens.next_value(&format!("capacity of layer '{}' at ({}, {})", name, x, y))?,
                );
            }
        }
        db.add_layer(name, direction, min_length, capacity);
    }

    log::info!(
        "Grid: {} layers, {} x {} cells, wire cost {}, via cost {}",
        n_layers,
        x_size,
        y_size,
        unit_length_wire_cost,
        unit_via_cost
    );
    Ok(())
}
