//! 图形文档模型
//!
//! 图形由若干图层组成，每个图层持有自己的实体。
//! 文档按值整体替换发布：使用方克隆当前图形、就地修改、
//! 再以新版本替换旧版本，后台任务因此可以安全持有旧快照。

use crate::entity::{Entity, EntityId};
use crate::input_parser::{InputParser, ParseError};
use crate::math::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认图层名
pub const DEFAULT_LAYER: &str = "0";

/// 长度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Units {
    #[default]
    Millimeter,
    Centimeter,
    Meter,
    Inch,
}

impl Units {
    /// 单位后缀
    pub fn suffix(&self) -> &'static str {
        match self {
            Units::Millimeter => "mm",
            Units::Centimeter => "cm",
            Units::Meter => "m",
            Units::Inch => "in",
        }
    }

}

/// 图层
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    entities: BTreeMap<EntityId, Entity>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            entities: BTreeMap::new(),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}

/// 图形文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawing {
    layers: BTreeMap<String, Layer>,
    current_layer: String,
    pub units: Units,
}

impl Drawing {
    /// 创建含默认图层的空图形
    pub fn new() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(DEFAULT_LAYER.to_string(), Layer::new(DEFAULT_LAYER));
        Self {
            layers,
            current_layer: DEFAULT_LAYER.to_string(),
            units: Units::default(),
        }
    }

    /// 当前图层名
    pub fn current_layer(&self) -> &str {
        &self.current_layer
    }

    /// 切换当前图层；图层不存在时返回 false
    pub fn set_current_layer(&mut self, name: &str) -> bool {
        if self.layers.contains_key(name) {
            self.current_layer = name.to_string();
            true
        } else {
            false
        }
    }

    /// 新建图层；重名时返回 false
    pub fn add_layer(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.layers.contains_key(&name) {
            return false;
        }
        self.layers.insert(name.clone(), Layer::new(name));
        true
    }

    /// 设置图层可见性；图层不存在时返回 false
    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.layers.get_mut(name) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// 将实体加入当前图层
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        // 当前图层在构造与切换时都保证存在
        self.layers
            .entry(self.current_layer.clone())
            .or_insert_with(|| Layer::new(self.current_layer.clone()))
            .entities
            .insert(id, entity);
        id
    }

    /// 移除实体（在所有图层中查找）
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        for layer in self.layers.values_mut() {
            if let Some(entity) = layer.entities.remove(&id) {
                return Some(entity);
            }
        }
        None
    }

    /// 查找实体
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.layers.values().find_map(|l| l.entities.get(&id))
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// 全部实体数量
    pub fn entity_count(&self) -> usize {
        self.layers.values().map(|l| l.entities.len()).sum()
    }

    /// 遍历可见图层中的实体
    pub fn visible_entities(&self) -> impl Iterator<Item = &Entity> {
        self.layers
            .values()
            .filter(|l| l.visible)
            .flat_map(|l| l.entities.values())
    }

    /// 按文档的单位语法解析距离
    ///
    /// 接受裸标量、带当前单位后缀的标量（如 "12.5mm"）、
    /// 长度<角度的长度部分，以及相对参考点的坐标。
    pub fn parse_distance(
        &self,
        input: &str,
        reference: Option<Point3>,
    ) -> Result<f64, ParseError> {
        let trimmed = input.trim();
        if let Some(bare) = trimmed.strip_suffix(self.units.suffix()) {
            if let Ok(value) = bare.trim_end().parse::<f64>() {
                return Ok(value);
            }
        }
        InputParser::parse_distance(trimmed, reference)
    }
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 测试 ==========
