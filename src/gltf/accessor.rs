use glam::{Vec2, Vec3};

use crate::gltf::{Accessor, BufferView, ComponentType, ElementType};

/// Bounds-checked element reads over an accessor's bytes.
///
/// Construction checks that the whole accessor fits inside its buffer view
/// and buffer, so the getters only need to check the element index.
#[derive(Debug, Clone, Copy)]
pub struct AccessorReader<'a> {
    data: &'a [u8],
    stride: usize,
    count: usize,
    component_type: ComponentType,
    element_type: ElementType,
}

impl<'a> AccessorReader<'a> {
    pub(super) fn new(
        accessor: &Accessor,
        view: &BufferView,
        buffer: &'a [u8],
    ) -> Option<AccessorReader<'a>> {
        let element_size = accessor.element_size();
        let stride = view.byte_stride.unwrap_or(element_size).max(element_size);
        let start = view.byte_offset.checked_add(accessor.byte_offset)?;
        let len = match accessor.count {
            0 => 0,
            count => (count - 1).checked_mul(stride)?.checked_add(element_size)?,
        };
        let end = start.checked_add(len)?;
        if accessor.byte_offset + len > view.byte_length || end > buffer.len() {
            tracing::warn!(
                start,
                end,
                buffer_len = buffer.len(),
                "accessor overruns its buffer"
            );
            return None;
        }
        Some(AccessorReader {
            data: &buffer[start..end],
            stride,
            count: accessor.count,
            component_type: accessor.component_type,
            element_type: accessor.element_type,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    fn element(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.stride;
        let size = self.component_type.size() * self.element_type.component_count();
        self.data.get(start..start + size)
    }

    fn f32_at(bytes: &[u8], component: usize) -> f32 {
        bytemuck::pod_read_unaligned(&bytes[component * 4..component * 4 + 4])
    }

    /// Reads element `index` of a float VEC3 accessor.
    pub fn vec3(&self, index: usize) -> Option<Vec3> {
        if (self.component_type, self.element_type) != (ComponentType::F32, ElementType::Vec3) {
            return None;
        }
        let bytes = self.element(index)?;
        Some(Vec3::new(
            Self::f32_at(bytes, 0),
            Self::f32_at(bytes, 1),
            Self::f32_at(bytes, 2),
        ))
    }

    /// Reads element `index` of a float VEC2 accessor.
    pub fn vec2(&self, index: usize) -> Option<Vec2> {
        if (self.component_type, self.element_type) != (ComponentType::F32, ElementType::Vec2) {
            return None;
        }
        let bytes = self.element(index)?;
        Some(Vec2::new(Self::f32_at(bytes, 0), Self::f32_at(bytes, 1)))
    }

    /// Reads element `index` of an unsigned 8/16/32-bit SCALAR accessor.
    pub fn index(&self, index: usize) -> Option<u32> {
        if self.element_type != ElementType::Scalar {
            return None;
        }
        let bytes = self.element(index)?;
        match self.component_type {
            ComponentType::U8 => Some(bytes[0] as u32),
            ComponentType::U16 => Some(bytemuck::pod_read_unaligned::<u16>(bytes) as u32),
            ComponentType::U32 => Some(bytemuck::pod_read_unaligned::<u32>(bytes)),
            _ => None,
        }
    }

    pub fn iter_vec3(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.count).map_while(|i| self.vec3(i))
    }
}

#[cfg(test)]
mod tests {
    use crate::gltf::test_util::*;
    use crate::gltf::{ComponentType, Document, ElementType};
    use glam::Vec3;

    #[test]
    fn reads_strided_positions() {
        let mut document = Document::default();
        // Two VEC3s interleaved with a float of padding.
        let floats: [f32; 7] = [1.0, 2.0, 3.0, -1.0, 4.0, 5.0, 6.0];
        let accessor = push_accessor(
            &mut document,
            bytemuck::cast_slice(&floats),
            2,
            ComponentType::F32,
            ElementType::Vec3,
            None,
        );
        document.buffer_views[0].byte_stride = Some(16);
        let reader = document.reader(accessor).unwrap();
        assert_eq!(Some(Vec3::new(1.0, 2.0, 3.0)), reader.vec3(0));
        assert_eq!(Some(Vec3::new(4.0, 5.0, 6.0)), reader.vec3(1));
        assert_eq!(None, reader.vec3(2));
        assert_eq!(None, reader.vec2(0));
    }

    #[test]
    fn rejects_accessor_overrunning_buffer() {
        let mut document = Document::default();
        let accessor = push_vec3s(&mut document, &[[0.0; 3]; 2]);
        document.accessors[accessor].count = 3;
        assert!(document.reader(accessor).is_none());
    }

    #[test]
    fn reads_all_index_widths() {
        let mut document = Document::default();
        let bytes = push_accessor(
            &mut document,
            &[7, 8, 9],
            3,
            ComponentType::U8,
            ElementType::Scalar,
            None,
        );
        let shorts = push_u16_indices(&mut document, &[300, 2]);
        let ints = push_accessor(
            &mut document,
            bytemuck::cast_slice(&[70000u32]),
            1,
            ComponentType::U32,
            ElementType::Scalar,
            None,
        );
        assert_eq!(Some(9), document.reader(bytes).unwrap().index(2));
        assert_eq!(Some(300), document.reader(shorts).unwrap().index(0));
        assert_eq!(Some(70000), document.reader(ints).unwrap().index(0));
    }

    #[test]
    fn missing_buffer_view_has_no_reader() {
        let mut document = Document::default();
        let accessor = push_vec3s(&mut document, &[[0.0; 3]]);
        document.accessors[accessor].buffer_view = None;
        assert!(document.reader(accessor).is_none());
    }
}
